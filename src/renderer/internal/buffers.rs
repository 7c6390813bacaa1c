use std::mem;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::error::RendererError;
use crate::renderer::internal::{scoped, BindLayouts, RenderContext, ShadowResources};
use crate::renderer::lights::{LightsData, LightsUniform, PointLightRaw};
use crate::renderer::uniforms::CameraUniform;

pub(crate) struct CameraBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

impl CameraBuffer {
    pub(crate) fn new(device: &wgpu::Device, layouts: &BindLayouts) -> Result<Self, RendererError> {
        scoped(device, "camera uniform buffer", || Self::create(device, layouts))
    }

    fn create(device: &wgpu::Device, layouts: &BindLayouts) -> Self {
        let camera = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CameraBuffer"),
            contents: bytemuck::bytes_of(&camera),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("CameraBindGroup"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    pub(crate) fn update(&self, context: &RenderContext, camera: &CameraUniform) {
        context
            .queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(camera));
    }
}

/// Sun and cascade uniform, point-light storage and the shadow map binding.
pub(crate) struct LightsBuffer {
    pub(crate) buffer: wgpu::Buffer,
    _point_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
    point_count: u32,
}

impl LightsBuffer {
    /// Point lights never change after load, so their storage is written once.
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        lights: &LightsData,
        shadows: &ShadowResources,
    ) -> Result<Self, RendererError> {
        scoped(device, "lights buffers", || {
            Self::create(device, layouts, lights, shadows)
        })
    }

    fn create(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        lights: &LightsData,
        shadows: &ShadowResources,
    ) -> Self {
        let initial = LightsUniform::zeroed();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("LightsBuffer"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut points: Vec<PointLightRaw> = lights
            .point_lights()
            .iter()
            .map(PointLightRaw::from_data)
            .collect();
        let point_count = points.len() as u32;
        // Storage bindings cannot be empty.
        if points.is_empty() {
            points.push(PointLightRaw::zeroed());
        }
        let point_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("PointLightBuffer"),
            contents: bytemuck::cast_slice(&points),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("LightsBindGroup"),
            layout: &layouts.lights,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: point_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(shadows.array_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(shadows.sampler()),
                },
            ],
        });

        log::debug!(
            "Lights buffer: {} bytes uniform, {} point lights ({} bytes each)",
            mem::size_of::<LightsUniform>(),
            point_count,
            mem::size_of::<PointLightRaw>()
        );

        Self {
            buffer,
            _point_buffer: point_buffer,
            bind_group,
            point_count,
        }
    }

    pub(crate) fn point_count(&self) -> u32 {
        self.point_count
    }

    pub(crate) fn update(&self, context: &RenderContext, uniform: &LightsUniform) {
        context
            .queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }
}
