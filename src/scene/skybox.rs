use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::scene::textures::rgba_len;

/// Order of the six faces as uploaded to the cube map.
pub const FACE_NAMES: [&str; 6] = ["+X", "-X", "+Y", "-Y", "+Z", "-Z"];

const FLAT_FACE: [u8; 4] = [40, 48, 64, 255];

/// Unit cube around the origin as 12 triangles. Drawn without culling.
pub const CUBE_VERTICES: [[f32; 3]; 36] = [
    // -Z
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    // -X
    [-0.5, -0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, -0.5, 0.5],
    // +X
    [0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, -0.5],
    [0.5, -0.5, -0.5],
    // +Z
    [-0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, -0.5, 0.5],
    [-0.5, -0.5, 0.5],
    // +Y
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, 0.5, -0.5],
    // -Y
    [-0.5, -0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
];

/// RGBA8 pixels of the six cube faces, all `size x size`.
#[derive(Debug, Clone)]
pub struct SkyboxFaces {
    size: u32,
    faces: Vec<Vec<u8>>,
}

impl SkyboxFaces {
    /// Relative paths are resolved against `base`. The first readable square
    /// face fixes the size; faces that are unreadable or differ in size are
    /// replaced by a flat color.
    pub fn load(base: &Path, paths: &[PathBuf; 6]) -> Self {
        let images: Vec<Option<RgbaImage>> = paths
            .iter()
            .zip(FACE_NAMES)
            .map(|(path, face)| {
                let path = base.join(path);
                match image::open(&path) {
                    Ok(image) => Some(image.to_rgba8()),
                    Err(err) => {
                        log::warn!("Skybox face {} {:?} unreadable: {}", face, path, err);
                        None
                    }
                }
            })
            .collect();

        let size = images
            .iter()
            .flatten()
            .find(|image| image.width() == image.height())
            .map(|image| image.width())
            .unwrap_or(1);

        let faces = images
            .into_iter()
            .zip(FACE_NAMES)
            .map(|(image, face)| match image {
                Some(image) if image.width() == size && image.height() == size => image.into_raw(),
                Some(image) => {
                    log::warn!(
                        "Skybox face {} is {}x{}, expected {}x{}; using a flat color",
                        face,
                        image.width(),
                        image.height(),
                        size,
                        size
                    );
                    flat_face(size)
                }
                None => flat_face(size),
            })
            .collect();

        log::info!("Loaded skybox with {}x{} faces", size, size);
        Self { size, faces }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn faces(&self) -> impl Iterator<Item = &[u8]> {
        self.faces.iter().map(Vec::as_slice)
    }
}

fn flat_face(size: u32) -> Vec<u8> {
    FLAT_FACE
        .iter()
        .copied()
        .cycle()
        .take(rgba_len(size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_spans_unit_extent() {
        for axis in 0..3 {
            let min = CUBE_VERTICES.iter().map(|v| v[axis]).fold(f32::MAX, f32::min);
            let max = CUBE_VERTICES.iter().map(|v| v[axis]).fold(f32::MIN, f32::max);
            assert_eq!((min, max), (-0.5, 0.5));
        }
    }

    #[test]
    fn mismatched_face_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["px", "nx", "py", "ny", "pz", "nz"];
        for (index, name) in names.iter().enumerate() {
            let size = if index == 3 { 2 } else { 4 };
            RgbaImage::from_pixel(size, size, image::Rgba([200, 100, 50, 255]))
                .save(dir.path().join(format!("{name}.png")))
                .unwrap();
        }
        let paths = names.map(|name| PathBuf::from(format!("{name}.png")));

        let faces = SkyboxFaces::load(dir.path(), &paths);
        let faces_data: Vec<&[u8]> = faces.faces().collect();

        assert_eq!(faces.size(), 4);
        assert_eq!(faces_data.len(), 6);
        assert_eq!(&faces_data[0][..4], &[200, 100, 50, 255]);
        assert_eq!(&faces_data[3][..4], &FLAT_FACE);
    }

    #[test]
    fn unreadable_faces_still_produce_six_layers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ["a", "b", "c", "d", "e", "f"].map(PathBuf::from);

        let faces = SkyboxFaces::load(dir.path(), &paths);

        assert_eq!(faces.size(), 1);
        assert_eq!(faces.faces().count(), 6);
    }
}
