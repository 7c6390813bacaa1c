use std::mem;

use crate::error::ProgramError;
use crate::renderer::lights::LightsUniform;
use crate::renderer::program::{Program, ProgramSource};
use crate::renderer::uniforms::{CameraUniform, ShadowViewUniform};
use crate::renderer::vertex::{PositionVertex, Vertex};
use crate::renderer::PipelineBuilder;
use crate::scene::textures::LAYERS_PER_MATERIAL;
use crate::settings::{DebugFlags, MAX_CASCADES};

pub(crate) const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub(crate) const SKY_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const SCENE_SHADER: &str = include_str!("../../shader/scene.wgsl");
const SHADOW_SHADER: &str = include_str!("../../shader/shadow.wgsl");
const SKYBOX_SHADER: &str = include_str!("../../shader/skybox.wgsl");
const COMPOSITE_SHADER: &str = include_str!("../../shader/composite.wgsl");
const MARKER_SHADER: &str = include_str!("../../shader/light_markers.wgsl");

/// Bind group layouts shared by pipelines and the resources bound to them.
pub(crate) struct BindLayouts {
    pub(crate) camera: wgpu::BindGroupLayout,
    pub(crate) lights: wgpu::BindGroupLayout,
    pub(crate) materials: wgpu::BindGroupLayout,
    pub(crate) shadow_view: wgpu::BindGroupLayout,
    pub(crate) skybox: wgpu::BindGroupLayout,
    pub(crate) composite: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("CameraBindLayout"),
            entries: &[uniform_entry::<CameraUniform>(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let lights = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("LightsBindLayout"),
            entries: &[
                uniform_entry::<LightsUniform>(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let materials = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialTexturesBindLayout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2Array),
                sampler_entry(1),
            ],
        });

        let shadow_view = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowUniformLayout"),
            entries: &[uniform_entry::<ShadowViewUniform>(
                0,
                wgpu::ShaderStages::VERTEX,
            )],
        });

        let skybox = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SkyboxBindLayout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::Cube),
                sampler_entry(1),
            ],
        });

        let composite = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("CompositeBindLayout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
            ],
        });

        Self {
            camera,
            lights,
            materials,
            shadow_view,
            skybox,
            composite,
        }
    }
}

fn uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Every program the frame needs, compiled and linked. Built before any
/// scene buffer or attachment exists so shader errors abort startup early.
pub(crate) struct Pipelines {
    pub(crate) layouts: BindLayouts,
    pub(crate) scene: wgpu::RenderPipeline,
    pub(crate) shadow: wgpu::RenderPipeline,
    pub(crate) skybox: wgpu::RenderPipeline,
    pub(crate) composite: wgpu::RenderPipeline,
    pub(crate) markers: wgpu::RenderPipeline,
}

impl Pipelines {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, ProgramError> {
        let shader_constants = [
            ("MAX_CASCADES", MAX_CASCADES as u32),
            ("LAYERS_PER_MATERIAL", LAYERS_PER_MATERIAL as u32),
            ("DEBUG_CASCADE_COLORS", DebugFlags::CASCADE_COLORS.bits()),
        ];
        let composite_constants = [("SURFACE_IS_SRGB", surface_format.is_srgb() as u32)];

        let scene_program = Program::compile(
            device,
            &ProgramSource {
                label: "Scene",
                vertex: SCENE_SHADER,
                fragment: None,
                constants: &shader_constants,
            },
        )?;
        let shadow_program = Program::compile(
            device,
            &ProgramSource {
                label: "Shadow",
                vertex: SHADOW_SHADER,
                fragment: None,
                constants: &[],
            },
        )?;
        let skybox_program = Program::compile(
            device,
            &ProgramSource {
                label: "Skybox",
                vertex: SKYBOX_SHADER,
                fragment: None,
                constants: &[],
            },
        )?;
        let composite_program = Program::compile(
            device,
            &ProgramSource {
                label: "Composite",
                vertex: COMPOSITE_SHADER,
                fragment: None,
                constants: &composite_constants,
            },
        )?;
        let marker_program = Program::compile(
            device,
            &ProgramSource {
                label: "LightMarkers",
                vertex: MARKER_SHADER,
                fragment: None,
                constants: &shader_constants,
            },
        )?;

        let layouts = BindLayouts::new(device);

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ScenePipelineLayout"),
            bind_group_layouts: &[&layouts.camera, &layouts.lights, &layouts.materials],
            push_constant_ranges: &[],
        });
        let scene = PipelineBuilder::new(device, &scene_layout, &scene_program)
            .with_label("ScenePipeline")
            .with_vertex_buffer(Vertex::layout())
            .with_color_target(SCENE_COLOR_FORMAT, None)
            .with_masked_color_target(SKY_COLOR_FORMAT)
            .with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
            .build()?;

        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ShadowPipelineLayout"),
            bind_group_layouts: &[&layouts.shadow_view],
            push_constant_ranges: &[],
        });
        let shadow = PipelineBuilder::new(device, &shadow_layout, &shadow_program)
            .with_label("ShadowPipeline")
            .depth_only()
            .with_vertex_buffer(Vertex::layout())
            .with_no_culling()
            .with_depth_stencil_biased(SHADOW_FORMAT, 2, 2.0)
            .build()?;

        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SkyboxPipelineLayout"),
            bind_group_layouts: &[&layouts.camera, &layouts.skybox],
            push_constant_ranges: &[],
        });
        let skybox = PipelineBuilder::new(device, &skybox_layout, &skybox_program)
            .with_label("SkyboxPipeline")
            .with_vertex_buffer(PositionVertex::layout())
            .with_masked_color_target(SCENE_COLOR_FORMAT)
            .with_color_target(SKY_COLOR_FORMAT, None)
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
            .with_no_culling()
            .build()?;

        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("CompositePipelineLayout"),
            bind_group_layouts: &[&layouts.composite],
            push_constant_ranges: &[],
        });
        let composite = PipelineBuilder::new(device, &composite_layout, &composite_program)
            .with_label("CompositePipeline")
            .with_color_target(surface_format, None)
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::Always)
            .with_no_culling()
            .build()?;

        let marker_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("LightMarkerPipelineLayout"),
            bind_group_layouts: &[&layouts.camera, &layouts.lights],
            push_constant_ranges: &[],
        });
        let markers = PipelineBuilder::new(device, &marker_layout, &marker_program)
            .with_label("LightMarkerPipeline")
            .with_color_target(surface_format, Some(wgpu::BlendState::ALPHA_BLENDING))
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::Less)
            .with_no_culling()
            .build()?;

        log::info!("Compiled and linked 5 render programs");

        Ok(Self {
            layouts,
            scene,
            shadow,
            skybox,
            composite,
            markers,
        })
    }
}
