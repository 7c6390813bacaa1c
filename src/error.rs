use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a usable [`AppConfig`](crate::settings::AppConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file {path:?} is missing required field `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
}

/// The primary scene file could not be turned into a batch.
#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("failed to import scene {path:?}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("scene {path:?} is incomplete: {reason}")]
    Incomplete { path: PathBuf, reason: String },
}

/// Shader stage the compiler rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program '{program}' failed to compile {stage} stage: {message}")]
    Compile {
        program: String,
        stage: ShaderStage,
        message: String,
    },

    #[error("program '{program}' failed to link: {message}")]
    Link { program: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CascadeError {
    #[error("cascade {cascade} has degenerate bounds")]
    DegenerateBounds { cascade: usize },
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("offscreen attachments are incomplete: {reason}")]
    IncompleteAttachments { reason: String },

    #[error("{resource} needs {requested} {what}, device allows {limit}")]
    ExceedsLimit {
        resource: &'static str,
        what: &'static str,
        requested: u32,
        limit: u32,
    },

    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    #[error("GPU out of memory")]
    OutOfMemory,

    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Anything that stops the application from reaching its first frame.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneLoadError),

    #[error(transparent)]
    Renderer(#[from] RendererError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
