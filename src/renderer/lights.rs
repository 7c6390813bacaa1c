use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::settings::{DebugFlags, LightingSettings, MAX_CASCADES};

#[derive(Clone, Copy, Debug)]
pub struct DirectionalLightData {
    /// Points toward the light.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct PointLightData {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

/// The scene's lights: one fixed sun plus the point lights found in the
/// light-marker file.
#[derive(Clone, Debug)]
pub struct LightsData {
    directional: DirectionalLightData,
    point: Vec<PointLightData>,
}

impl LightsData {
    pub fn from_settings(settings: &LightingSettings, markers: &[Vec3]) -> Self {
        let directional = DirectionalLightData {
            direction: sun_direction(settings.direction),
            color: Vec3::from(settings.color),
            intensity: settings.intensity,
            ambient: settings.ambient,
        };
        let point = markers
            .iter()
            .map(|&position| PointLightData {
                position,
                color: Vec3::from(settings.point_color),
                intensity: settings.point_intensity,
                range: settings.point_range,
            })
            .collect();
        Self { directional, point }
    }

    pub fn directional(&self) -> &DirectionalLightData {
        &self.directional
    }

    pub fn point_lights(&self) -> &[PointLightData] {
        &self.point
    }
}

fn sun_direction(direction: [f32; 3]) -> Vec3 {
    let direction = Vec3::from(direction).normalize_or_zero();
    if direction == Vec3::ZERO {
        Vec3::Y
    } else {
        direction
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct PointLightRaw {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl PointLightRaw {
    pub fn from_data(data: &PointLightData) -> Self {
        Self {
            position_range: [
                data.position.x,
                data.position.y,
                data.position.z,
                data.range,
            ],
            color_intensity: [data.color.x, data.color.y, data.color.z, data.intensity],
        }
    }
}

/// Lighting state read by the scene program every frame.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    /// xyz toward the light, w ambient term.
    pub direction_ambient: [f32; 4],
    pub color_intensity: [f32; 4],
    pub cascade_view_proj: [[[f32; 4]; 4]; MAX_CASCADES],
    /// Far view-space distance of each cascade.
    pub cascade_splits: [f32; 4],
    /// cascade count, point light count, valid cascade mask, debug flags.
    pub counts: [u32; 4],
}

impl LightsUniform {
    /// `boundaries` holds `matrices.len() + 1` split distances; a `None`
    /// matrix marks a cascade that was skipped this frame.
    pub fn new(
        lights: &LightsData,
        boundaries: &[f32],
        matrices: &[Option<Mat4>],
        point_count: u32,
        debug: DebugFlags,
    ) -> Self {
        let mut uniform = Self::zeroed();
        let sun = lights.directional();
        uniform.direction_ambient = [sun.direction.x, sun.direction.y, sun.direction.z, sun.ambient];
        uniform.color_intensity = [sun.color.x, sun.color.y, sun.color.z, sun.intensity];

        let count = matrices
            .len()
            .min(boundaries.len().saturating_sub(1))
            .min(MAX_CASCADES);
        let mut valid_mask = 0u32;
        for index in 0..count {
            uniform.cascade_splits[index] = boundaries[index + 1];
            if let Some(matrix) = matrices[index] {
                uniform.cascade_view_proj[index] = matrix.to_cols_array_2d();
                valid_mask |= 1 << index;
            }
        }
        uniform.counts = [count as u32, point_count, valid_mask, debug.bits()];
        uniform
    }

    pub fn cascade_valid(&self, index: usize) -> bool {
        index < MAX_CASCADES && self.counts[2] & (1 << index) != 0
    }
}
