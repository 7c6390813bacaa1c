// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    /// Rotation-only view for the skybox.
    pub sky_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            sky_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 0.0],
            _padding: 0.0,
        }
    }

    pub fn from_matrices(view: Mat4, projection: Mat4, camera_pos: Vec3) -> Self {
        let rotation = Mat4::from_mat3(Mat3::from_mat4(view));
        Self {
            view: view.to_cols_array_2d(),
            view_proj: (projection * view).to_cols_array_2d(),
            sky_view_proj: (projection * rotation).to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            _padding: 0.0,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-layer transform consumed by the depth-only shadow program.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ShadowViewUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniform_is_208_bytes() {
        // 3 * mat4x4<f32> = 192 bytes, vec3<f32> = 12 bytes, padding = 4 bytes
        assert_eq!(std::mem::size_of::<CameraUniform>(), 208);
    }

    #[test]
    fn sky_transform_ignores_translation() {
        let projection = Mat4::perspective_rh(1.0, 1.0, 0.1, 10.0);
        let a = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let b = Mat4::look_at_rh(Vec3::new(5.0, 2.0, -3.0), Vec3::new(5.0, 2.0, -4.0), Vec3::Y);

        let ua = CameraUniform::from_matrices(a, projection, Vec3::ZERO);
        let ub = CameraUniform::from_matrices(b, projection, Vec3::new(5.0, 2.0, -3.0));

        assert_eq!(ua.sky_view_proj, ub.sky_view_proj);
        assert_ne!(ua.view_proj, ub.view_proj);
    }
}
