pub mod cascades;
pub mod draw;
pub(crate) mod internal;
pub mod lights;
pub mod pipeline_builder;
pub mod program;
pub mod renderer;
pub mod resize;
pub mod uniforms;
pub mod vertex;

pub use cascades::{compute_cascades, split_boundaries, Cascade, CascadeParams};
pub use draw::DrawRecord;
pub use lights::{LightsData, LightsUniform, PointLightRaw};
pub use pipeline_builder::PipelineBuilder;
pub use program::{Program, ProgramSource};
pub use renderer::Renderer;
pub use resize::ResizeGate;
pub use uniforms::CameraUniform;
pub use vertex::{PositionVertex, Vertex};
