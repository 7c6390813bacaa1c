use std::mem;

use glam::Mat4;

use crate::renderer::internal::pipeline::SHADOW_FORMAT;
use crate::error::RendererError;
use crate::renderer::internal::{scoped, BindLayouts, RenderContext, SceneBuffers};
use crate::renderer::uniforms::ShadowViewUniform;
use crate::settings::MAX_CASCADES;

struct ShadowArray {
    _texture: wgpu::Texture,
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
    size: u32,
}

impl ShadowArray {
    fn new(device: &wgpu::Device, label: &str, layers: u32, size: u32) -> Self {
        let layers = layers.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}ArrayView")),
            format: Some(SHADOW_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            aspect: wgpu::TextureAspect::All,
            base_array_layer: 0,
            array_layer_count: Some(layers),
            ..Default::default()
        });

        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}Layer{layer}")),
                    format: Some(SHADOW_FORMAT),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    aspect: wgpu::TextureAspect::All,
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        Self {
            _texture: texture,
            array_view,
            layer_views,
            size,
        }
    }
}

/// Cascade depth maps plus the per-layer view uniform used to fill them.
pub(crate) struct ShadowResources {
    cascades: ShadowArray,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    staging_buffer: wgpu::Buffer,
}

impl ShadowResources {
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        cascade_count: usize,
        map_size: u32,
    ) -> Result<Self, RendererError> {
        scoped(device, "shadow cascade maps", || {
            Self::create(device, layouts, cascade_count, map_size)
        })
    }

    fn create(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        cascade_count: usize,
        map_size: u32,
    ) -> Self {
        let cascades = ShadowArray::new(
            device,
            "CascadeShadowMap",
            cascade_count.min(MAX_CASCADES) as u32,
            map_size,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let uniform_size = mem::size_of::<ShadowViewUniform>() as u64;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowUniformBuffer"),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowStagingBuffer"),
            size: uniform_size * MAX_CASCADES as u64,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ShadowUniformBindGroup"),
            layout: &layouts.shadow_view,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        log::info!(
            "Created {} shadow cascades of {}x{}",
            cascades.layer_views.len(),
            map_size,
            map_size
        );

        Self {
            cascades,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            staging_buffer,
        }
    }

    pub(crate) fn array_view(&self) -> &wgpu::TextureView {
        &self.cascades.array_view
    }

    pub(crate) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Renders one depth pass per cascade that has a matrix; `None` entries
    /// are skipped and left unsampled by the scene program.
    pub(crate) fn render(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        scene: &SceneBuffers,
        matrices: &[Option<Mat4>],
    ) {
        let uniform_size = mem::size_of::<ShadowViewUniform>() as u64;

        for (index, matrix) in matrices.iter().enumerate().take(MAX_CASCADES) {
            if let Some(matrix) = matrix {
                let uniform = ShadowViewUniform {
                    view_proj: matrix.to_cols_array_2d(),
                };
                context.queue.write_buffer(
                    &self.staging_buffer,
                    index as u64 * uniform_size,
                    bytemuck::bytes_of(&uniform),
                );
            }
        }

        for (index, matrix) in matrices.iter().enumerate() {
            if matrix.is_none() {
                continue;
            }
            let Some(view) = self.cascades.layer_views.get(index) else {
                log::warn!(
                    "Cascade {} has no shadow layer ({} allocated)",
                    index,
                    self.cascades.layer_views.len()
                );
                continue;
            };

            encoder.copy_buffer_to_buffer(
                &self.staging_buffer,
                index as u64 * uniform_size,
                &self.uniform_buffer,
                0,
                uniform_size,
            );

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ShadowPass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let size = self.cascades.size as f32;
            pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            scene.draw(&mut pass);
        }
    }
}
