use std::path::Path;

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::error::SceneLoadError;
use crate::renderer::Vertex;

/// One accepted triangle primitive, already in world space.
#[derive(Debug, Clone)]
pub struct ImportedMesh {
    pub label: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    /// Material names; a mesh's `material` indexes into this list.
    pub materials: Vec<String>,
}

pub struct SceneLoader;

impl SceneLoader {
    /// Imports every triangle primitive reachable from the default scene.
    /// Primitives without a material share a `default_material` slot.
    pub fn import_scene(path: &Path, default_material: &str) -> Result<ImportedScene, SceneLoadError> {
        let (document, buffers) =
            Self::import_document(path).map_err(|source| SceneLoadError::Import {
                path: path.to_path_buf(),
                source,
            })?;

        if document.meshes().len() == 0 {
            return Err(SceneLoadError::Incomplete {
                path: path.to_path_buf(),
                reason: "document contains no meshes".to_string(),
            });
        }

        let mut materials: Vec<String> = document
            .materials()
            .map(|material| match material.name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => format!("Material{}", material.index().unwrap_or(0)),
            })
            .collect();
        let mut default_slot = None;

        let mut meshes = Vec::new();
        for (mesh, transform) in Self::mesh_instances(&document) {
            let mesh_name = mesh.name().unwrap_or("Unnamed").to_string();
            for primitive in mesh.primitives() {
                let label = format!("{}#{}", mesh_name, primitive.index());

                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping primitive {} with unsupported mode {:?}",
                        label,
                        primitive.mode()
                    );
                    continue;
                }

                let Some((vertices, indices)) =
                    Self::load_primitive(&primitive, &buffers, transform, &label)
                else {
                    continue;
                };

                let material = match primitive.material().index() {
                    Some(index) => index,
                    None => *default_slot.get_or_insert_with(|| {
                        materials.push(default_material.to_string());
                        materials.len() - 1
                    }),
                };

                log::trace!(
                    "Accepted primitive {}: {} vertices, {} indices, material {}",
                    label,
                    vertices.len(),
                    indices.len(),
                    materials[material]
                );
                meshes.push(ImportedMesh {
                    label,
                    vertices,
                    indices,
                    material,
                });
            }
        }

        if meshes.is_empty() {
            return Err(SceneLoadError::Incomplete {
                path: path.to_path_buf(),
                reason: "no drawable triangle primitives".to_string(),
            });
        }

        log::info!(
            "Imported {} primitives with {} materials from {:?}",
            meshes.len(),
            materials.len(),
            path
        );
        Ok(ImportedScene { meshes, materials })
    }

    /// Centroid of every triangle whose material is named `light_material`.
    pub fn import_light_markers(path: &Path, light_material: &str) -> Result<Vec<Vec3>, gltf::Error> {
        let (document, buffers) = Self::import_document(path)?;

        let mut markers = Vec::new();
        for (mesh, transform) in Self::mesh_instances(&document) {
            for primitive in mesh.primitives() {
                if primitive.material().name() != Some(light_material)
                    || primitive.mode() != gltf::mesh::Mode::Triangles
                {
                    continue;
                }

                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
                let Some(positions) = reader.read_positions() else {
                    continue;
                };
                let positions: Vec<Vec3> = positions
                    .map(|p| transform.transform_point3(Vec3::from(p)))
                    .collect();
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };

                for face in indices.chunks_exact(3) {
                    let corners: Option<Vec<Vec3>> = face
                        .iter()
                        .map(|&i| positions.get(i as usize).copied())
                        .collect();
                    if let Some(corners) = corners {
                        markers.push(corners.iter().copied().sum::<Vec3>() / 3.0);
                    }
                }
            }
        }

        log::debug!("Found {} light markers in {:?}", markers.len(), path);
        Ok(markers)
    }

    fn import_document(
        path: &Path,
    ) -> Result<(gltf::Document, Vec<gltf::buffer::Data>), gltf::Error> {
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)?;
        Ok((document, buffers))
    }

    /// Meshes paired with their world transform. Documents without scenes
    /// expose every mesh once at the origin.
    fn mesh_instances(document: &gltf::Document) -> Vec<(gltf::Mesh<'_>, Mat4)> {
        let mut instances = Vec::new();
        let scene = document.default_scene().or_else(|| document.scenes().next());
        match scene {
            Some(scene) => {
                for node in scene.nodes() {
                    Self::collect_node(&node, Mat4::IDENTITY, &mut instances);
                }
            }
            None => instances.extend(document.meshes().map(|mesh| (mesh, Mat4::IDENTITY))),
        }
        instances
    }

    fn collect_node<'a>(
        node: &gltf::Node<'a>,
        parent: Mat4,
        instances: &mut Vec<(gltf::Mesh<'a>, Mat4)>,
    ) {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            instances.push((mesh, world));
        }
        for child in node.children() {
            Self::collect_node(&child, world, instances);
        }
    }

    fn load_primitive(
        primitive: &gltf::Primitive,
        buffers: &[gltf::buffer::Data],
        transform: Mat4,
        label: &str,
    ) -> Option<(Vec<Vertex>, Vec<u32>)> {
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipping primitive {}: missing positions", label);
            return None;
        };
        let positions: Vec<Vec3> = positions.map(Vec3::from).collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        if indices.len() < 3 || indices.len() % 3 != 0 {
            log::warn!(
                "Skipping primitive {}: {} indices do not form whole triangles",
                label,
                indices.len()
            );
            return None;
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            log::warn!(
                "Skipping primitive {}: index {} exceeds {} vertices",
                label,
                bad,
                positions.len()
            );
            return None;
        }

        let uvs: Vec<Vec2> = reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().map(Vec2::from).collect())
            .unwrap_or_else(|| vec![Vec2::ZERO; positions.len()]);

        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|n| n.map(Vec3::from).collect())
            .unwrap_or_else(|| {
                log::debug!("    No normals for {}, using face normals", label);
                face_normals(&positions, &indices)
            });

        let tangents: Vec<Vec3> = reader
            .read_tangents()
            .map(|t| t.map(|t| Vec3::new(t[0], t[1], t[2])).collect())
            .unwrap_or_else(|| {
                log::debug!("    No tangents for {}, generating them", label);
                accumulate_tangents(&positions, &uvs, &indices)
            });

        if uvs.len() != positions.len()
            || normals.len() != positions.len()
            || tangents.len() != positions.len()
        {
            log::warn!("Skipping primitive {}: attribute counts differ", label);
            return None;
        }

        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let vertices = positions
            .iter()
            .zip(normals.iter())
            .zip(uvs.iter())
            .zip(tangents.iter())
            .map(|(((pos, normal), uv), tangent)| {
                let normal = (normal_matrix * *normal).normalize_or_zero();
                let tangent = transform.transform_vector3(*tangent);
                let (tangent, bitangent) = tangent_frame(normal, tangent);
                Vertex {
                    pos: transform.transform_point3(*pos).to_array(),
                    tangent: tangent.to_array(),
                    bitangent: bitangent.to_array(),
                    uv: uv.to_array(),
                }
            })
            .collect();

        Some((vertices, indices))
    }
}

fn face_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }
    normals
        .into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                Vec3::Y
            } else {
                n
            }
        })
        .collect()
}

/// Per-vertex tangents accumulated from UV derivatives of adjacent faces.
fn accumulate_tangents(positions: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> Vec<Vec3> {
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    if uvs.len() != positions.len() {
        return tangents;
    }

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);

        let edge1 = positions[i1] - positions[i0];
        let edge2 = positions[i2] - positions[i0];
        let delta_uv1 = uvs[i1] - uvs[i0];
        let delta_uv2 = uvs[i2] - uvs[i0];

        let f = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y);
        let tangent = if f.is_finite() {
            (edge1 * delta_uv2.y - edge2 * delta_uv1.y) * f
        } else {
            edge1
        };

        tangents[i0] += tangent;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
    }
    tangents
}

/// Gram-Schmidt orthonormalised tangent and `normal x tangent`, so that
/// `cross(tangent, bitangent)` gives back the normal.
pub(crate) fn tangent_frame(normal: Vec3, tangent: Vec3) -> (Vec3, Vec3) {
    let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };
    let mut tangent = (tangent - normal * normal.dot(tangent)).normalize_or_zero();

    // Degenerate UVs: pick any direction perpendicular to the normal.
    if tangent.length_squared() < 0.0001 {
        tangent = if normal.y.abs() < 0.999 {
            Vec3::Y.cross(normal).normalize()
        } else {
            Vec3::X.cross(normal).normalize()
        };
    }

    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}
