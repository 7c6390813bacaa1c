// renderer/renderer.rs
use std::sync::Arc;

use glam::Mat4;
use winit::{dpi::PhysicalSize, window::Window};

use crate::error::RendererError;
use crate::renderer::cascades::{compute_cascades, split_boundaries, CascadeParams};
use crate::renderer::internal::{
    check_texture_limits, AcquireFailure, CameraBuffer, LightsBuffer, OffscreenTargets, Pipelines,
    RenderContext, SceneBuffers, ShadowResources, SkyboxResources, TextureRequest,
};
use crate::renderer::lights::{LightsData, LightsUniform};
use crate::renderer::resize::ResizeGate;
use crate::renderer::uniforms::CameraUniform;
use crate::scene::{Bounds, Camera, SceneBatch, SkyboxFaces};
use crate::settings::{AppConfig, DebugFlags};

/// Owns every GPU resource and records the shadow, scene and composite
/// passes of a frame.
pub struct Renderer {
    context: RenderContext,
    pipelines: Pipelines,
    camera_buffer: CameraBuffer,
    lights_buffer: LightsBuffer,
    shadows: ShadowResources,
    scene: SceneBuffers,
    skybox: SkyboxResources,
    targets: OffscreenTargets,
    gate: ResizeGate,
    lights: LightsData,
    bounds: Bounds,
    cascade_count: usize,
    debug: DebugFlags,
    shadow_matrices: Vec<Option<Mat4>>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        config: &AppConfig,
        batch: &SceneBatch,
        sky: &SkyboxFaces,
    ) -> Result<Self, RendererError> {
        let context = RenderContext::new(window, &config.render).await?;
        let device = &context.device;

        // Shader failures must surface before anything scene-sized exists.
        let pipelines = Pipelines::new(device, context.config.format)?;

        check_texture_limits(
            &device.limits(),
            &[
                TextureRequest::new(
                    "material texture array",
                    batch.textures().size(),
                    batch.textures().layer_count() as u32,
                ),
                TextureRequest::new(
                    "shadow cascade array",
                    config.shadows.map_size,
                    config.shadows.cascade_count as u32,
                ),
                TextureRequest::new("skybox cube map", sky.size(), 6),
            ],
        )?;

        let lights = LightsData::from_settings(&config.lighting, batch.light_positions());
        let camera_buffer = CameraBuffer::new(device, &pipelines.layouts)?;
        let shadows = ShadowResources::new(
            device,
            &pipelines.layouts,
            config.shadows.cascade_count,
            config.shadows.map_size,
        )?;
        let lights_buffer = LightsBuffer::new(device, &pipelines.layouts, &lights, &shadows)?;
        let scene = SceneBuffers::new(
            device,
            &context.queue,
            &pipelines.layouts,
            batch,
            context.supports_indirect_first_instance,
        )?;
        let skybox = SkyboxResources::new(device, &context.queue, &pipelines.layouts, sky)?;

        let size = (context.config.width, context.config.height);
        let targets = OffscreenTargets::new(device, &pipelines.layouts, size, 0)?;
        let gate = ResizeGate::new(size.0, size.1);

        log::info!(
            "Renderer ready: {} draws, {} point lights, {} cascades",
            batch.draws().len(),
            lights_buffer.point_count(),
            config.shadows.cascade_count
        );

        Ok(Self {
            context,
            pipelines,
            camera_buffer,
            lights_buffer,
            shadows,
            scene,
            skybox,
            targets,
            gate,
            lights,
            bounds: batch.bounds(),
            cascade_count: config.shadows.cascade_count,
            debug: config.debug.flags(),
            shadow_matrices: Vec::new(),
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.aspect_ratio()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Requests new surface dimensions. Same-size and zero-size requests are
    /// ignored; requests during a pass are applied once it ends. Returns the
    /// size the attachments were recreated at, if they were.
    pub fn resize(
        &mut self,
        new_size: PhysicalSize<u32>,
    ) -> Result<Option<PhysicalSize<u32>>, RendererError> {
        match self.gate.request(new_size.width, new_size.height) {
            Some(size) => self.recreate_targets(size).map(Some),
            None => Ok(None),
        }
    }

    fn recreate_targets(&mut self, size: (u32, u32)) -> Result<PhysicalSize<u32>, RendererError> {
        self.context.resize(PhysicalSize::new(size.0, size.1));
        let generation = self.targets.generation() + 1;
        self.targets = OffscreenTargets::new(
            &self.context.device,
            &self.pipelines.layouts,
            size,
            generation,
        )?;
        log::info!("Resized attachments to {}x{}", size.0, size.1);
        Ok(PhysicalSize::new(size.0, size.1))
    }

    /// Writes the camera and lighting uniforms for the coming frame.
    pub fn update(&mut self, camera: &Camera) {
        let view = camera.view();
        let uniform = CameraUniform::from_matrices(view, camera.projection(), camera.position());
        self.camera_buffer.update(&self.context, &uniform);

        let params = CascadeParams {
            view,
            fov_y_radians: camera.fov_y_radians(),
            aspect: camera.aspect(),
            near: camera.near(),
            far: camera.far(),
            light_direction: self.lights.directional().direction,
            cascade_count: self.cascade_count,
            depth_extension: camera.far().max(self.bounds.diameter()),
        };
        let boundaries = split_boundaries(params.near, params.far, params.cascade_count);
        self.shadow_matrices = compute_cascades(&params)
            .into_iter()
            .map(|result| match result {
                Ok(cascade) => Some(cascade.view_proj),
                Err(err) => {
                    log::warn!("Skipping shadow cascade: {}", err);
                    None
                }
            })
            .collect();

        let lights = LightsUniform::new(
            &self.lights,
            &boundaries,
            &self.shadow_matrices,
            self.lights_buffer.point_count(),
            self.debug,
        );
        self.lights_buffer.update(&self.context, &lights);
    }

    /// Records and submits one frame. Only unrecoverable conditions are
    /// returned as errors; a lost or outdated surface skips the frame.
    /// Returns the new size when a resize deferred during the frame was
    /// applied after it.
    pub fn render(&mut self) -> Result<Option<PhysicalSize<u32>>, RendererError> {
        let frame = match self.context.acquire() {
            Ok(frame) => frame,
            Err(AcquireFailure::Skip) => return Ok(None),
            Err(AcquireFailure::Fatal) => return Err(RendererError::OutOfMemory),
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("FrameEncoder"),
                });

        self.gate.begin_pass();
        self.shadows.render(
            &self.context,
            &mut encoder,
            &self.pipelines.shadow,
            &self.scene,
            &self.shadow_matrices,
        );
        self.record_scene_pass(&mut encoder);
        self.record_composite_pass(&mut encoder, &surface_view);
        let deferred = self.gate.end_pass();

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        deferred
            .map(|size| self.recreate_targets(size))
            .transpose()
    }

    fn record_scene_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ScenePass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.scene_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.sky_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.scene);
        pass.set_bind_group(0, &self.camera_buffer.bind_group, &[]);
        pass.set_bind_group(1, &self.lights_buffer.bind_group, &[]);
        pass.set_bind_group(2, &self.scene.material_bind_group, &[]);
        self.scene.draw(&mut pass);

        self.skybox.draw(&mut pass, &self.pipelines.skybox);
    }

    fn record_composite_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("CompositePass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: None,
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.composite);
        pass.set_bind_group(0, &self.targets.composite_bind_group, &[]);
        pass.draw(0..3, 0..1);

        let markers = self.lights_buffer.point_count();
        if self.debug.contains(DebugFlags::LIGHT_MARKERS) && markers > 0 {
            pass.set_pipeline(&self.pipelines.markers);
            pass.set_bind_group(0, &self.camera_buffer.bind_group, &[]);
            pass.set_bind_group(1, &self.lights_buffer.bind_group, &[]);
            pass.draw(0..6, 0..markers);
        }
    }
}
