use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::RendererError;
use crate::settings::RenderSettings;

/// What the frame loop should do after failing to acquire a surface texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcquireFailure {
    /// Skip this frame and try again next time.
    Skip,
    Fatal,
}

pub(crate) struct RenderContext {
    pub(crate) surface: wgpu::Surface<'static>,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) config: wgpu::SurfaceConfiguration,
    pub(crate) size: PhysicalSize<u32>,
    /// Indirect draws may carry a non-zero first instance.
    pub(crate) supports_indirect_first_instance: bool,
}

impl RenderContext {
    pub(crate) async fn new(
        window: Arc<Window>,
        settings: &RenderSettings,
    ) -> Result<Self, RendererError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        log::info!("Surface created successfully!");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info());
        log::info!("Using backend: {:?}", adapter.get_info().backend);
        let adapter_features = adapter.features();
        log::debug!("Adapter features: {:?}", adapter_features);

        let mut required_features = wgpu::Features::empty();
        let supports_indirect_first_instance = adapter_features
            .contains(wgpu::Features::INDIRECT_FIRST_INSTANCE)
            && adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::INDIRECT_EXECUTION);
        if supports_indirect_first_instance {
            required_features |= wgpu::Features::INDIRECT_FIRST_INSTANCE;
            log::info!("Indirect multi-draw enabled");
        } else {
            log::warn!("Indirect first instance not supported; drawing records one by one");
        }

        // Large material sets need more array layers than the defaults allow.
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_texture_array_layers: adapter_limits.max_texture_array_layers,
            ..wgpu::Limits::default().using_resolution(adapter_limits.clone())
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoSurfaceFormat)?;

        let present_mode = settings.present_mode(&surface_caps.present_modes);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            supports_indirect_first_instance,
        })
    }

    /// Reconfigures the surface; zero-sized requests are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) -> bool {
        if new_size.width == 0 || new_size.height == 0 {
            return false;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    pub(crate) fn acquire(&self) -> Result<wgpu::SurfaceTexture, AcquireFailure> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Err(AcquireFailure::Skip)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface acquire timed out, skipping frame");
                Err(AcquireFailure::Skip)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface acquire ran out of memory");
                Err(AcquireFailure::Fatal)
            }
            Err(wgpu::SurfaceError::Other) => {
                log::error!("Unknown surface error, skipping frame");
                Err(AcquireFailure::Skip)
            }
        }
    }

    pub(crate) fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}
