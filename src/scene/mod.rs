// scene/mod.rs

pub mod batch;
pub mod camera;
pub mod loader;
pub mod skybox;
pub mod textures;

// Re-export commonly used types
pub use batch::{Bounds, SceneBatch};
pub use camera::{Camera, MoveDirection};
pub use loader::{ImportedMesh, ImportedScene, SceneLoader};
pub use skybox::SkyboxFaces;
pub use textures::{MaterialTextures, TextureKind};
