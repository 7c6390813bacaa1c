use glam::{Mat4, Vec3};
use wgpu_temple::error::CascadeError;
use wgpu_temple::renderer::{compute_cascades, split_boundaries, CascadeParams};

const EPSILON: f32 = 1e-4;

/// Mirrors the scene shader's shadow lookup: returns (u, v, depth).
fn project_shadow_cpu(matrix: Mat4, world_pos: Vec3) -> Vec3 {
    let clip = matrix * world_pos.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    Vec3::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5, ndc.z)
}

fn params(cascade_count: usize) -> CascadeParams {
    CascadeParams {
        view: Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        fov_y_radians: 45_f32.to_radians(),
        aspect: 16.0 / 9.0,
        near: 0.1,
        far: 100.0,
        light_direction: Vec3::new(-0.3, 1.0, 0.4).normalize(),
        cascade_count,
        depth_extension: 100.0,
    }
}

#[test]
fn three_cascades_split_near_to_far() {
    let boundaries = split_boundaries(0.1, 100.0, 3);

    assert_eq!(boundaries.len(), 4);
    assert_eq!(boundaries[0], 0.1);
    assert_eq!(boundaries[3], 100.0);
    for pair in boundaries.windows(2) {
        assert!(pair[0] < pair[1], "{boundaries:?}");
    }
    for far in &boundaries[1..] {
        assert!(*far > 0.1 && *far <= 100.0);
    }
}

#[test]
fn every_cascade_contains_its_slab_center() {
    let params = params(3);
    let camera_world = params.view.inverse();
    let cascades = compute_cascades(&params);
    assert_eq!(cascades.len(), 3);

    for (index, cascade) in cascades.iter().enumerate() {
        let cascade = cascade.as_ref().expect("cascade should be valid");
        assert!(cascade.view_proj.is_finite());

        let depth = 0.5 * (cascade.split_near + cascade.split_far);
        let center = camera_world.transform_point3(Vec3::new(0.0, 0.0, -depth));
        let projected = project_shadow_cpu(cascade.view_proj, center);

        assert!(
            (0.0..=1.0).contains(&projected.x) && (0.0..=1.0).contains(&projected.y),
            "cascade {index} misses its center: {projected:?}"
        );
        assert!((0.0..=1.0).contains(&projected.z), "cascade {index} depth {projected:?}");
    }
}

#[test]
fn consecutive_cascades_share_boundaries() {
    let cascades: Vec<_> = compute_cascades(&params(4))
        .into_iter()
        .map(|result| result.expect("cascade should be valid"))
        .collect();

    assert!((cascades[0].split_near - 0.1).abs() < EPSILON);
    assert!((cascades[3].split_far - 100.0).abs() < EPSILON);
    for pair in cascades.windows(2) {
        assert_eq!(pair[0].split_far, pair[1].split_near);
    }
}

#[test]
fn collapsed_frustum_is_rejected_per_cascade() {
    let mut params = params(2);
    params.near = 5.0;
    params.far = 5.0;

    let cascades = compute_cascades(&params);

    assert_eq!(cascades.len(), 2);
    assert_eq!(
        cascades[0],
        Err(CascadeError::DegenerateBounds { cascade: 0 })
    );
    assert_eq!(
        cascades[1],
        Err(CascadeError::DegenerateBounds { cascade: 1 })
    );
}
