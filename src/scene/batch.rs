//! Flattening of an imported scene into shared vertex/index/draw arrays.

use glam::Vec3;

use crate::error::SceneLoadError;
use crate::renderer::{DrawRecord, Vertex};
use crate::scene::loader::{ImportedMesh, SceneLoader};
use crate::scene::textures::MaterialTextures;
use crate::settings::SceneSettings;

/// Axis-aligned box around every batched vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vertex>) -> Option<Self> {
        let mut points = points.into_iter().map(|v| Vec3::from(v.pos));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn diameter(&self) -> f32 {
        (self.max - self.min).length()
    }
}

/// The whole scene as one set of GPU-ready arrays. Immutable once built.
#[derive(Debug, Clone)]
pub struct SceneBatch {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    draws: Vec<DrawRecord>,
    materials: Vec<String>,
    textures: MaterialTextures,
    lights: Vec<Vec3>,
    bounds: Bounds,
}

impl SceneBatch {
    /// Imports `<directory>/<model_file>`, its material textures and the
    /// optional light-marker file.
    pub fn load(settings: &SceneSettings) -> Result<Self, SceneLoadError> {
        let model_path = settings.directory.join(&settings.model_file);
        let scene = SceneLoader::import_scene(&model_path, &settings.default_material)?;
        let textures = MaterialTextures::load(settings, &scene.materials);
        let lights = Self::load_light_markers(settings);

        Ok(Self::from_meshes(
            scene.meshes,
            scene.materials,
            textures,
            lights,
        ))
    }

    fn load_light_markers(settings: &SceneSettings) -> Vec<Vec3> {
        if settings.lights_file.is_empty() {
            return Vec::new();
        }
        let path = settings.directory.join(&settings.lights_file);
        if !path.is_file() {
            log::info!("No light marker file at {:?}; scene has no point lights", path);
            return Vec::new();
        }
        match SceneLoader::import_light_markers(&path, &settings.light_material) {
            Ok(markers) => markers,
            Err(err) => {
                log::warn!("Ignoring light marker file {:?}: {}", path, err);
                Vec::new()
            }
        }
    }

    /// Appends meshes in order; each record's index range starts where the
    /// previous one ended.
    pub fn from_meshes(
        meshes: Vec<ImportedMesh>,
        materials: Vec<String>,
        textures: MaterialTextures,
        lights: Vec<Vec3>,
    ) -> Self {
        let vertex_total = meshes.iter().map(|m| m.vertices.len()).sum();
        let index_total = meshes.iter().map(|m| m.indices.len()).sum();
        let mut vertices = Vec::with_capacity(vertex_total);
        let mut indices = Vec::with_capacity(index_total);
        let mut draws = Vec::with_capacity(meshes.len());

        for mesh in meshes {
            if mesh.indices.is_empty() || mesh.vertices.is_empty() {
                log::warn!("Dropping empty mesh {}", mesh.label);
                continue;
            }
            let material = if mesh.material < materials.len() {
                mesh.material
            } else {
                log::warn!(
                    "Mesh {} references material {} of {}; using slot 0",
                    mesh.label,
                    mesh.material,
                    materials.len()
                );
                0
            };

            draws.push(DrawRecord::new(
                mesh.indices.len() as u32,
                indices.len() as u32,
                vertices.len() as i32,
                material as u32,
            ));
            indices.extend_from_slice(&mesh.indices);
            vertices.extend_from_slice(&mesh.vertices);
        }

        let bounds = Bounds::from_points(&vertices).unwrap_or(Bounds {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        });

        log::info!(
            "Scene batch: {} vertices, {} indices, {} draws, {} lights",
            vertices.len(),
            indices.len(),
            draws.len(),
            lights.len()
        );

        Self {
            vertices,
            indices,
            draws,
            materials,
            textures,
            lights,
            bounds,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    pub fn light_positions(&self) -> &[Vec3] {
        &self.lights
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> Vertex {
        Vertex {
            pos: [x, 0.0, 0.0],
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        }
    }

    fn mesh(label: &str, vertex_count: usize, indices: Vec<u32>, material: usize) -> ImportedMesh {
        ImportedMesh {
            label: label.to_string(),
            vertices: (0..vertex_count).map(|i| vertex(i as f32)).collect(),
            indices,
            material,
        }
    }

    fn textures() -> MaterialTextures {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = SceneSettings::with_directory(dir.path());
        settings.texture_size = 1;
        MaterialTextures::load(&settings, &["A".to_string(), "B".to_string()])
    }

    #[test]
    fn records_cover_disjoint_ranges() {
        let batch = SceneBatch::from_meshes(
            vec![
                mesh("a", 3, vec![0, 1, 2], 0),
                mesh("b", 4, vec![0, 1, 2, 2, 3, 0], 1),
                mesh("c", 3, vec![2, 1, 0], 1),
            ],
            vec!["A".to_string(), "B".to_string()],
            textures(),
            Vec::new(),
        );

        let draws = batch.draws();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0], DrawRecord::new(3, 0, 0, 0));
        assert_eq!(draws[1], DrawRecord::new(6, 3, 3, 1));
        assert_eq!(draws[2], DrawRecord::new(3, 9, 7, 1));

        for pair in draws.windows(2) {
            assert!(pair[0].base_vertex < pair[1].base_vertex);
            assert_eq!(pair[0].index_range().end, pair[1].index_range().start);
        }
        assert_eq!(batch.indices().len(), 12);
        assert_eq!(batch.vertices().len(), 10);
    }

    #[test]
    fn empty_meshes_are_dropped() {
        let batch = SceneBatch::from_meshes(
            vec![mesh("empty", 0, vec![], 0), mesh("tri", 3, vec![0, 1, 2], 0)],
            vec!["A".to_string()],
            textures(),
            Vec::new(),
        );

        assert_eq!(batch.draws(), &[DrawRecord::new(3, 0, 0, 0)]);
    }

    #[test]
    fn bounds_enclose_every_vertex() {
        let batch = SceneBatch::from_meshes(
            vec![mesh("a", 5, vec![0, 1, 2, 2, 3, 4], 0)],
            vec!["A".to_string()],
            textures(),
            Vec::new(),
        );

        assert_eq!(batch.bounds().min, Vec3::ZERO);
        assert_eq!(batch.bounds().max, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(batch.bounds().diameter(), 4.0);
    }
}
