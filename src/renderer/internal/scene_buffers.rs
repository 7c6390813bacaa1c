use wgpu::util::DeviceExt;

use crate::error::RendererError;
use crate::renderer::internal::{scoped, BindLayouts};
use crate::renderer::DrawRecord;
use crate::scene::{MaterialTextures, SceneBatch};

/// GPU copy of the scene batch: shared vertex and index buffers, the draw
/// records as indirect arguments, and the material texture array.
pub(crate) struct SceneBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    indirect_buffer: wgpu::Buffer,
    draws: Vec<DrawRecord>,
    _texture: wgpu::Texture,
    pub(crate) material_bind_group: wgpu::BindGroup,
    indirect: bool,
}

impl SceneBuffers {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindLayouts,
        batch: &SceneBatch,
        indirect: bool,
    ) -> Result<Self, RendererError> {
        scoped(device, "scene buffers", || {
            Self::create(device, queue, layouts, batch, indirect)
        })
    }

    fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindLayouts,
        batch: &SceneBatch,
        indirect: bool,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SceneVertexBuffer"),
            contents: non_empty(bytemuck::cast_slice(batch.vertices())),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SceneIndexBuffer"),
            contents: non_empty(bytemuck::cast_slice(batch.indices())),
            usage: wgpu::BufferUsages::INDEX,
        });
        let indirect_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SceneIndirectBuffer"),
            contents: non_empty(bytemuck::cast_slice(batch.draws())),
            usage: wgpu::BufferUsages::INDIRECT,
        });

        let texture = upload_material_textures(device, queue, batch.textures());
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("MaterialTextureArrayView"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("MaterialSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MaterialTexturesBindGroup"),
            layout: &layouts.materials,
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

        log::info!(
            "Uploaded scene: {} bytes of vertices, {} indices, {} draw records",
            std::mem::size_of_val(batch.vertices()),
            batch.indices().len(),
            batch.draws().len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            indirect_buffer,
            draws: batch.draws().to_vec(),
            _texture: texture,
            material_bind_group,
            indirect,
        }
    }

    /// Issues every draw record on an already configured pass: one
    /// multi-draw when indirect first-instance is available, one direct
    /// draw per record otherwise.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.draws.is_empty() {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        if self.indirect {
            pass.multi_draw_indexed_indirect(&self.indirect_buffer, 0, self.draws.len() as u32);
        } else {
            for record in &self.draws {
                pass.draw_indexed(
                    record.index_range(),
                    record.base_vertex,
                    record.instance_range(),
                );
            }
        }
    }
}

/// Wgpu rejects zero-sized initialised buffers.
fn non_empty(bytes: &[u8]) -> &[u8] {
    if bytes.is_empty() {
        &[0; 4]
    } else {
        bytes
    }
}

fn upload_material_textures(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    textures: &MaterialTextures,
) -> wgpu::Texture {
    let size = textures.size().max(1);
    let layers = textures.layer_count().max(1) as u32;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("MaterialTextureArray"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, data) in textures.layers().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
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

    texture
}
