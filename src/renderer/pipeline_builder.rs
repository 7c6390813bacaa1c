// src/renderer/pipeline_builder.rs

use crate::renderer::program::Program;

/// Builder for render pipelines over a compiled [`Program`].
///
/// Reduces boilerplate when creating pipelines by providing a fluent API
/// and common presets for depth/stencil, blending and write masks.
pub struct PipelineBuilder<'a> {
    device: &'a wgpu::Device,
    label: Option<&'a str>,
    layout: &'a wgpu::PipelineLayout,
    program: &'a Program,
    vertex_entry: &'a str,
    fragment_entry: Option<&'a str>,
    vertex_buffers: Vec<wgpu::VertexBufferLayout<'a>>,
    color_targets: Vec<Option<wgpu::ColorTargetState>>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    primitive: wgpu::PrimitiveState,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        layout: &'a wgpu::PipelineLayout,
        program: &'a Program,
    ) -> Self {
        Self {
            device,
            label: None,
            layout,
            program,
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            vertex_buffers: Vec::new(),
            color_targets: Vec::new(),
            depth_stencil: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
        }
    }

    /// Set the pipeline label for debugging
    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Create a depth-only pipeline (no fragment shader)
    pub fn depth_only(mut self) -> Self {
        self.fragment_entry = None;
        self
    }

    /// Add a vertex buffer layout
    pub fn with_vertex_buffer(mut self, layout: wgpu::VertexBufferLayout<'a>) -> Self {
        self.vertex_buffers.push(layout);
        self
    }

    /// Add a color target
    pub fn with_color_target(
        mut self,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Self {
        self.color_targets.push(Some(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        }));
        self
    }

    /// Add a color target the pipeline leaves untouched. The fragment
    /// stage must still declare an output at this location.
    pub fn with_masked_color_target(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_targets.push(Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::empty(),
        }));
        self
    }

    /// Configure depth/stencil state
    pub fn with_depth_stencil(
        mut self,
        format: wgpu::TextureFormat,
        depth_write: bool,
        depth_compare: wgpu::CompareFunction,
    ) -> Self {
        self.depth_stencil = Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: depth_write,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });
        self
    }

    /// Configure depth/stencil with custom bias (for shadow maps)
    pub fn with_depth_stencil_biased(
        mut self,
        format: wgpu::TextureFormat,
        constant_bias: i32,
        slope_bias: f32,
    ) -> Self {
        self.depth_stencil = Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: constant_bias,
                slope_scale: slope_bias,
                clamp: 0.0,
            },
        });
        self
    }

    /// Disable backface culling
    pub fn with_no_culling(mut self) -> Self {
        self.primitive.cull_mode = None;
        self
    }

    /// Build the render pipeline; validation failures are reported as link
    /// errors of the program.
    pub fn build(self) -> Result<wgpu::RenderPipeline, crate::error::ProgramError> {
        let device = self.device;
        self.program.link(device, |program| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: self.label,
                layout: Some(self.layout),
                vertex: wgpu::VertexState {
                    module: program.vertex_module(),
                    entry_point: Some(self.vertex_entry),
                    buffers: &self.vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: self.fragment_entry.map(|entry| wgpu::FragmentState {
                    module: program.fragment_module(),
                    entry_point: Some(entry),
                    targets: &self.color_targets,
                    compilation_options: Default::default(),
                }),
                primitive: self.primitive,
                depth_stencil: self.depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }
}
