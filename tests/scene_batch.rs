use std::path::Path;

use glam::Vec3;
use image::{Rgba, RgbaImage};
use wgpu_temple::error::SceneLoadError;
use wgpu_temple::renderer::DrawRecord;
use wgpu_temple::scene::{SceneBatch, TextureKind};
use wgpu_temple::settings::SceneSettings;

const TEXTURE_SIZE: u32 = 4;

/// Writes `<name>.gltf` + `<name>.bin` holding one indexed triangle.
fn write_triangle(dir: &Path, name: &str, material: &str, corners: [[f32; 3]; 3]) {
    write_mesh(
        dir,
        name,
        &[material],
        serde_json::json!([{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]),
        corners,
    );
}

/// Like [`write_triangle`], but with caller-supplied materials and
/// primitives. Every primitive can reuse accessors 0 (positions) and 1
/// (indices).
fn write_mesh(
    dir: &Path,
    name: &str,
    materials: &[&str],
    primitives: serde_json::Value,
    corners: [[f32; 3]; 3],
) {
    let mut bin = Vec::new();
    for corner in corners {
        for value in corner {
            bin.extend_from_slice(&value.to_le_bytes());
        }
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    std::fs::write(dir.join(format!("{name}.bin")), &bin).unwrap();

    let min = (0..3).map(|axis| corners.iter().map(|c| c[axis]).fold(f32::MAX, f32::min));
    let max = (0..3).map(|axis| corners.iter().map(|c| c[axis]).fold(f32::MIN, f32::max));
    let min: Vec<f32> = min.collect();
    let max: Vec<f32> = max.collect();

    let gltf = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "name": "triangle",
            "primitives": primitives
        }],
        "materials": materials
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect::<Vec<_>>(),
        "buffers": [{ "uri": format!("{name}.bin"), "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": min, "max": max
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });
    std::fs::write(
        dir.join(format!("{name}.gltf")),
        serde_json::to_string_pretty(&gltf).unwrap(),
    )
    .unwrap();
}

fn default_color(kind: TextureKind) -> [u8; 4] {
    match kind {
        TextureKind::Diffuse => [200, 10, 10, 255],
        TextureKind::Normal => [128, 128, 255, 255],
        TextureKind::Specular => [30, 30, 30, 255],
    }
}

fn write_defaults(dir: &Path) {
    for kind in TextureKind::ALL {
        let folder = dir.join(kind.folder());
        std::fs::create_dir_all(&folder).unwrap();
        RgbaImage::from_pixel(TEXTURE_SIZE, TEXTURE_SIZE, Rgba(default_color(kind)))
            .save(folder.join("DefaultMaterial.png"))
            .unwrap();
    }
}

fn settings(dir: &Path) -> SceneSettings {
    let mut settings = SceneSettings::with_directory(dir);
    settings.texture_size = TEXTURE_SIZE;
    settings
}

#[test]
fn one_triangle_scene_yields_one_record_and_default_textures() {
    let dir = tempfile::tempdir().unwrap();
    write_triangle(
        dir.path(),
        "model",
        "Stone",
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    );
    write_defaults(dir.path());

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();

    assert_eq!(batch.draws(), &[DrawRecord::new(3, 0, 0, 0)]);
    let bytes: &[u8] = bytemuck::cast_slice(batch.draws());
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    assert_eq!(words, vec![3, 1, 0, 0, 0]);

    assert_eq!(batch.materials(), &["Stone".to_string()]);
    assert_eq!(batch.vertices().len(), 3);
    assert_eq!(batch.indices(), &[0, 1, 2]);
    assert!(batch.light_positions().is_empty());

    let textures = batch.textures();
    assert_eq!(textures.layer_count(), 3);
    for kind in TextureKind::ALL {
        let layer = textures.layer(kind.layer(0)).unwrap();
        assert_eq!(layer.len(), (TEXTURE_SIZE * TEXTURE_SIZE * 4) as usize);
        for pixel in layer.chunks_exact(4) {
            assert_eq!(pixel, default_color(kind), "{kind:?}");
        }
    }
}

#[test]
fn triangle_normal_is_recoverable_from_the_tangent_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_triangle(
        dir.path(),
        "model",
        "Stone",
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    );

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();

    for vertex in batch.vertices() {
        let normal = Vec3::from(vertex.tangent).cross(Vec3::from(vertex.bitangent));
        assert!(normal.abs_diff_eq(Vec3::Z, 1e-5), "{normal:?}");
    }
}

#[test]
fn light_markers_become_face_centroids() {
    let dir = tempfile::tempdir().unwrap();
    write_triangle(
        dir.path(),
        "model",
        "Stone",
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    );
    write_triangle(
        dir.path(),
        "lights",
        "light_source",
        [[3.0, 3.0, 0.0], [6.0, 3.0, 0.0], [3.0, 6.0, 3.0]],
    );

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();

    assert_eq!(batch.light_positions().len(), 1);
    assert!(batch.light_positions()[0].abs_diff_eq(Vec3::new(4.0, 4.0, 1.0), 1e-5));
}

#[test]
fn missing_model_is_an_import_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = SceneBatch::load(&settings(dir.path())).unwrap_err();

    assert!(matches!(err, SceneLoadError::Import { .. }), "{err}");
}

const CORNERS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

#[test]
fn non_triangle_primitives_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_mesh(
        dir.path(),
        "model",
        &["Stone"],
        serde_json::json!([
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0, "mode": 1 },
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }
        ]),
        CORNERS,
    );

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();

    assert_eq!(batch.draws(), &[DrawRecord::new(3, 0, 0, 0)]);
    assert_eq!(batch.vertices().len(), 3);
}

#[test]
fn document_without_meshes_is_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.gltf"),
        r#"{ "asset": { "version": "2.0" } }"#,
    )
    .unwrap();

    let err = SceneBatch::load(&settings(dir.path())).unwrap_err();

    assert!(matches!(err, SceneLoadError::Incomplete { .. }), "{err}");
}

#[test]
fn scene_with_only_rejected_primitives_is_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    write_mesh(
        dir.path(),
        "model",
        &["Stone"],
        serde_json::json!([
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0, "mode": 0 },
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0, "mode": 3 }
        ]),
        CORNERS,
    );

    let err = SceneBatch::load(&settings(dir.path())).unwrap_err();

    match err {
        SceneLoadError::Incomplete { reason, .. } => {
            assert!(reason.contains("triangle"), "{reason}")
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn unparseable_light_file_yields_no_lights() {
    let dir = tempfile::tempdir().unwrap();
    write_triangle(dir.path(), "model", "Stone", CORNERS);
    std::fs::write(dir.path().join("lights.gltf"), "{ this is not gltf").unwrap();

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();

    assert!(batch.light_positions().is_empty());
    assert_eq!(batch.draws().len(), 1);
}

#[test]
fn missing_texture_paths_are_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    write_defaults(dir.path());
    // Two materials sharing a name resolve to the same texture paths.
    write_mesh(
        dir.path(),
        "model",
        &["Stone", "Stone"],
        serde_json::json!([
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 },
            { "attributes": { "POSITION": 0 }, "indices": 1, "material": 1 }
        ]),
        CORNERS,
    );

    let batch = SceneBatch::load(&settings(dir.path())).unwrap();
    let textures = batch.textures();

    assert_eq!(textures.layer_count(), 6);
    let missing = textures.missing_paths();
    assert_eq!(missing.len(), TextureKind::ALL.len());
    for kind in TextureKind::ALL {
        let expected = dir.path().join(kind.folder()).join("Stone.png");
        assert_eq!(missing.iter().filter(|p| **p == expected).count(), 1);
    }
}
