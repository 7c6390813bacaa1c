pub mod buffers;
pub mod checks;
pub mod context;
pub mod pipeline;
pub mod scene_buffers;
pub mod shadows;
pub mod skybox;
pub mod targets;

pub(crate) use buffers::{CameraBuffer, LightsBuffer};
pub(crate) use checks::{check_texture_limits, scoped, TextureRequest};
pub(crate) use context::{AcquireFailure, RenderContext};
pub(crate) use pipeline::{BindLayouts, Pipelines};
pub(crate) use scene_buffers::SceneBuffers;
pub(crate) use shadows::ShadowResources;
pub(crate) use skybox::SkyboxResources;
pub(crate) use targets::OffscreenTargets;
