//! Cascaded shadow map partitioning.
//!
//! The camera frustum is cut into slabs along view depth. Each slab gets an
//! orthographic light-space transform that tightly encloses its corners.

use glam::{Mat4, Vec3, Vec4};

use crate::error::CascadeError;

/// Weight of the logarithmic scheme when blending split distances.
pub const SPLIT_LAMBDA: f32 = 0.5;

const DEGENERATE_EPSILON: f32 = 1e-5;

/// Camera and light state needed to fit the cascades of one frame.
#[derive(Debug, Clone, Copy)]
pub struct CascadeParams {
    pub view: Mat4,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Direction toward the light.
    pub light_direction: Vec3,
    pub cascade_count: usize,
    /// Extra depth added on the light side of every cascade so that casters
    /// outside the slab still land in the map.
    pub depth_extension: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascade {
    pub view_proj: Mat4,
    pub split_near: f32,
    pub split_far: f32,
}

/// Returns `count + 1` boundaries; the first is `near` and the last is `far`.
pub fn split_boundaries(near: f32, far: f32, count: usize) -> Vec<f32> {
    let count = count.max(1);
    let ratio = far / near;
    let mut boundaries = Vec::with_capacity(count + 1);
    boundaries.push(near);
    for i in 1..count {
        let t = i as f32 / count as f32;
        let log = near * ratio.powf(t);
        let uniform = near + (far - near) * t;
        boundaries.push(SPLIT_LAMBDA * log + (1.0 - SPLIT_LAMBDA) * uniform);
    }
    boundaries.push(far);
    boundaries
}

/// Fits every cascade; a degenerate slab yields an error in its slot.
pub fn compute_cascades(params: &CascadeParams) -> Vec<Result<Cascade, CascadeError>> {
    let boundaries = split_boundaries(params.near, params.far, params.cascade_count);
    boundaries
        .windows(2)
        .enumerate()
        .map(|(index, range)| {
            let view_proj = cascade_matrix(index, params, range[0], range[1])?;
            Ok(Cascade {
                view_proj,
                split_near: range[0],
                split_far: range[1],
            })
        })
        .collect()
}

/// Light-space transform for the slab `[split_near, split_far]`.
pub fn cascade_matrix(
    index: usize,
    params: &CascadeParams,
    split_near: f32,
    split_far: f32,
) -> Result<Mat4, CascadeError> {
    let degenerate = CascadeError::DegenerateBounds { cascade: index };

    if !(split_near > 0.0 && split_far - split_near > DEGENERATE_EPSILON) {
        return Err(degenerate);
    }

    let corners = frustum_corners(params, split_near, split_far).ok_or(degenerate.clone())?;
    let centroid = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;

    let direction = params.light_direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Err(degenerate);
    }
    let up = if direction.abs().dot(Vec3::Y) > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let light_view = Mat4::look_at_rh(centroid + direction, centroid, up);

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in &corners {
        let local = light_view.transform_point3(*corner);
        min = min.min(local);
        max = max.max(local);
    }

    if max.x - min.x <= DEGENERATE_EPSILON || max.y - min.y <= DEGENERATE_EPSILON {
        return Err(degenerate);
    }

    // Light looks down -Z, so the nearest corner has the largest z.
    let extension = params.depth_extension.max(0.0);
    let projection =
        Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z - extension, -min.z);

    let view_proj = projection * light_view;
    if !view_proj.is_finite() {
        return Err(degenerate);
    }
    Ok(view_proj)
}

/// World space corners of the camera sub-frustum, near plane first.
fn frustum_corners(params: &CascadeParams, near: f32, far: f32) -> Option<[Vec3; 8]> {
    let projection = Mat4::perspective_rh(params.fov_y_radians, params.aspect, near, far);
    let inverse = (projection * params.view).inverse();

    let mut corners = [Vec3::ZERO; 8];
    let mut slot = 0;
    for z in [0.0, 1.0] {
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let world = inverse * Vec4::new(x, y, z, 1.0);
            if world.w.abs() <= f32::EPSILON {
                return None;
            }
            let point = world.truncate() / world.w;
            if !point.is_finite() {
                return None;
            }
            corners[slot] = point;
            slot += 1;
        }
    }
    Some(corners)
}
