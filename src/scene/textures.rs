//! Material texture array assembly.
//!
//! Every material owns three consecutive layers (diffuse, normal, specular)
//! of one RGBA8 array. Files are looked up as `<dir>/<kind>/<material>.<ext>`
//! and replaced by the folder's default texture when missing or unreadable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::RgbaImage;
use rayon::prelude::*;

use crate::settings::SceneSettings;

pub const LAYERS_PER_MATERIAL: usize = 3;

/// Byte length of a square RGBA8 image, computed without `u32` overflow.
pub fn rgba_len(size: u32) -> usize {
    size as usize * size as usize * 4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Specular,
}

impl TextureKind {
    pub const ALL: [TextureKind; LAYERS_PER_MATERIAL] =
        [TextureKind::Diffuse, TextureKind::Normal, TextureKind::Specular];

    pub fn folder(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Normal => "normal",
            TextureKind::Specular => "specular",
        }
    }

    /// Used when even the default texture cannot be read.
    pub fn flat_color(self) -> [u8; 4] {
        match self {
            TextureKind::Diffuse => [128, 128, 128, 255],
            TextureKind::Normal => [128, 128, 255, 255],
            TextureKind::Specular => [0, 0, 0, 255],
        }
    }

    pub fn layer(self, material: usize) -> usize {
        material * LAYERS_PER_MATERIAL + self as usize
    }
}

enum Decoded {
    Loaded(RgbaImage),
    Missing,
    Malformed(image::ImageError),
}

/// CPU-side contents of the material texture array.
#[derive(Debug, Clone)]
pub struct MaterialTextures {
    size: u32,
    layers: Vec<Vec<u8>>,
    missing: Vec<PathBuf>,
}

impl MaterialTextures {
    pub fn load(settings: &SceneSettings, materials: &[String]) -> Self {
        let size = settings.texture_size;
        let dir = settings.directory.as_path();
        let path_for = |kind: TextureKind, name: &str| {
            dir.join(kind.folder())
                .join(format!("{}.{}", name, settings.texture_extension))
        };

        let mut reported: HashSet<PathBuf> = HashSet::new();
        let mut missing = Vec::new();

        let defaults: Vec<Vec<u8>> = TextureKind::ALL
            .iter()
            .map(|&kind| {
                let path = path_for(kind, &settings.default_material);
                match decode(&path, size) {
                    Decoded::Loaded(image) => image.into_raw(),
                    Decoded::Missing => {
                        log::error!(
                            "Default {} texture {:?} is missing; using a flat color",
                            kind.folder(),
                            path
                        );
                        reported.insert(path.clone());
                        missing.push(path);
                        flat_layer(size, kind.flat_color())
                    }
                    Decoded::Malformed(err) => {
                        log::error!(
                            "Default {} texture {:?} is unreadable ({}); using a flat color",
                            kind.folder(),
                            path,
                            err
                        );
                        flat_layer(size, kind.flat_color())
                    }
                }
            })
            .collect();

        let jobs: Vec<(usize, TextureKind, PathBuf)> = materials
            .iter()
            .enumerate()
            .flat_map(|(index, name)| {
                TextureKind::ALL
                    .iter()
                    .map(move |&kind| (index, kind, path_for(kind, name)))
            })
            .collect();

        let decoded: Vec<Decoded> = jobs
            .par_iter()
            .map(|(_, _, path)| decode(path, size))
            .collect();

        let mut layers = Vec::with_capacity(jobs.len());
        for ((index, kind, path), result) in jobs.into_iter().zip(decoded) {
            let layer = match result {
                Decoded::Loaded(image) => image.into_raw(),
                Decoded::Missing => {
                    if reported.insert(path.clone()) {
                        log::warn!(
                            "Missing {} texture {:?} for material '{}'; using default",
                            kind.folder(),
                            path,
                            materials[index]
                        );
                        missing.push(path);
                    }
                    defaults[kind as usize].clone()
                }
                Decoded::Malformed(err) => {
                    log::warn!(
                        "Malformed {} texture {:?} for material '{}' ({}); using default",
                        kind.folder(),
                        path,
                        materials[index],
                        err
                    );
                    defaults[kind as usize].clone()
                }
            };
            layers.push(layer);
        }

        log::info!(
            "Assembled {} texture layers of {}x{} for {} materials",
            layers.len(),
            size,
            size,
            materials.len()
        );
        Self {
            size,
            layers,
            missing,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&[u8]> {
        self.layers.get(index).map(Vec::as_slice)
    }

    /// Every path reported missing during assembly, once each.
    pub fn missing_paths(&self) -> &[PathBuf] {
        &self.missing
    }

    pub fn layers(&self) -> impl Iterator<Item = &[u8]> {
        self.layers.iter().map(Vec::as_slice)
    }
}

fn decode(path: &Path, size: u32) -> Decoded {
    if !path.is_file() {
        return Decoded::Missing;
    }
    match image::open(path) {
        Ok(image) => {
            let mut rgba = image.to_rgba8();
            if rgba.width() != size || rgba.height() != size {
                log::debug!(
                    "Resizing {:?} from {}x{} to {}x{}",
                    path,
                    rgba.width(),
                    rgba.height(),
                    size,
                    size
                );
                rgba = image::imageops::resize(&rgba, size, size, FilterType::Triangle);
            }
            Decoded::Loaded(rgba)
        }
        Err(err) => Decoded::Malformed(err),
    }
}

fn flat_layer(size: u32, color: [u8; 4]) -> Vec<u8> {
    color
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
    fn layer_index_groups_by_material() {
        assert_eq!(TextureKind::Diffuse.layer(0), 0);
        assert_eq!(TextureKind::Specular.layer(0), 2);
        assert_eq!(TextureKind::Normal.layer(2), 7);
    }

    #[test]
    fn rgba_len_does_not_wrap_for_large_faces() {
        assert_eq!(rgba_len(2), 16);
        assert_eq!(rgba_len(40_000), 40_000usize * 40_000 * 4);
        assert_eq!(rgba_len(65_536), 1usize << 34);
    }

    #[test]
    fn missing_defaults_use_flat_colors() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = SceneSettings::with_directory(dir.path());
        settings.texture_size = 2;

        let textures = MaterialTextures::load(&settings, &["Stone".to_string()]);

        assert_eq!(textures.layer_count(), 3);
        assert_eq!(textures.missing_paths().len(), 6);
        assert_eq!(
            textures.layer(1).unwrap(),
            flat_layer(2, TextureKind::Normal.flat_color()).as_slice()
        );
    }

    #[test]
    fn present_texture_is_resized_to_layer_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("diffuse")).unwrap();
        RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]))
            .save(dir.path().join("diffuse/Stone.png"))
            .unwrap();
        let mut settings = SceneSettings::with_directory(dir.path());
        settings.texture_size = 4;

        let textures = MaterialTextures::load(&settings, &["Stone".to_string()]);
        let diffuse = textures.layer(0).unwrap();

        assert_eq!(diffuse.len(), 4 * 4 * 4);
        for (actual, expected) in diffuse[..4].iter().zip([10u8, 20, 30, 255]) {
            assert!(actual.abs_diff(expected) <= 1, "{actual} vs {expected}");
        }
    }

    #[test]
    fn malformed_texture_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("specular")).unwrap();
        std::fs::write(dir.path().join("specular/Stone.png"), b"not a png").unwrap();
        let mut settings = SceneSettings::with_directory(dir.path());
        settings.texture_size = 2;

        let textures = MaterialTextures::load(&settings, &["Stone".to_string()]);

        assert_eq!(
            textures.layer(2).unwrap(),
            flat_layer(2, TextureKind::Specular.flat_color()).as_slice()
        );
    }
}
