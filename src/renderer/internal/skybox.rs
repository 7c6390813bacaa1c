use wgpu::util::DeviceExt;

use crate::error::RendererError;
use crate::renderer::internal::{scoped, BindLayouts};
use crate::renderer::vertex::PositionVertex;
use crate::scene::skybox::CUBE_VERTICES;
use crate::scene::SkyboxFaces;

/// Cube mesh and cube map of the environment backdrop.
pub(crate) struct SkyboxResources {
    vertex_buffer: wgpu::Buffer,
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl SkyboxResources {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindLayouts,
        faces: &SkyboxFaces,
    ) -> Result<Self, RendererError> {
        scoped(device, "skybox cube map", || {
            Self::create(device, queue, layouts, faces)
        })
    }

    fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindLayouts,
        faces: &SkyboxFaces,
    ) -> Self {
        let vertices: Vec<PositionVertex> = CUBE_VERTICES
            .iter()
            .map(|&pos| PositionVertex { pos })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SkyboxVertexBuffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let size = faces.size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SkyboxCubeMap"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (face, data) in faces.faces().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: face as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * size),
                    rows_per_image: Some(size),
                },
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("SkyboxCubeView"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("SkyboxSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SkyboxBindGroup"),
            layout: &layouts.skybox,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            vertex_buffer,
            _texture: texture,
            bind_group,
        }
    }

    /// Draws the cube; group 0 (camera) must already be bound.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..CUBE_VERTICES.len() as u32, 0..1);
    }
}
