use std::cell::Cell;
use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use crate::settings::{CameraSettings, ProjectionSettings};

const WORLD_UP: Vec3 = Vec3::Y;

/// Pitch stays this far away from straight up/down.
pub const PITCH_MARGIN: f32 = 0.01;
pub const MAX_PITCH: f32 = FRAC_PI_2 - PITCH_MARGIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Free-flying first person camera.
///
/// View and projection matrices are cached and only rebuilt after one of
/// their inputs changed.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,

    speed: f32,
    min_speed: f32,
    max_speed: f32,
    look_sensitivity: f32,
    scroll_factor: f32,

    fov_y_radians: f32,
    aspect: f32,
    near: f32,
    far: f32,

    view: Cell<Mat4>,
    projection: Cell<Mat4>,
    view_dirty: Cell<bool>,
    projection_dirty: Cell<bool>,
    rebuilds: Cell<u32>,
}

impl Camera {
    pub fn new(camera: &CameraSettings, projection: &ProjectionSettings, aspect: f32) -> Self {
        let mut this = Self {
            position: Vec3::from(camera.position),
            yaw: camera.yaw_degrees.to_radians(),
            pitch: camera.pitch_degrees.to_radians().clamp(-MAX_PITCH, MAX_PITCH),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            speed: camera.speed.clamp(camera.min_speed, camera.max_speed),
            min_speed: camera.min_speed,
            max_speed: camera.max_speed,
            look_sensitivity: camera.look_sensitivity,
            scroll_factor: camera.scroll_factor,
            fov_y_radians: projection.fov_degrees.to_radians(),
            aspect: sanitize_aspect(aspect),
            near: projection.near,
            far: projection.far,
            view: Cell::new(Mat4::IDENTITY),
            projection: Cell::new(Mat4::IDENTITY),
            view_dirty: Cell::new(true),
            projection_dirty: Cell::new(true),
            rebuilds: Cell::new(0),
        };
        this.update_basis();
        this
    }

    pub fn process_movement(&mut self, direction: MoveDirection, dt: f32) {
        let distance = self.speed * dt;
        let offset = match direction {
            MoveDirection::Forward => self.front * distance,
            MoveDirection::Backward => -self.front * distance,
            MoveDirection::Right => self.right * distance,
            MoveDirection::Left => -self.right * distance,
            MoveDirection::Up => WORLD_UP * distance,
            MoveDirection::Down => -WORLD_UP * distance,
        };
        if offset != Vec3::ZERO {
            self.position += offset;
            self.view_dirty.set(true);
        }
    }

    /// `dx`/`dy` are raw pointer deltas; positive `dy` looks up.
    pub fn process_look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.look_sensitivity;
        self.pitch = (self.pitch + dy * self.look_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
        self.update_basis();
    }

    pub fn process_speed_change(&mut self, delta: f32, dt: f32) {
        self.speed =
            (self.speed + delta * dt * self.scroll_factor).clamp(self.min_speed, self.max_speed);
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        let aspect = sanitize_aspect(aspect);
        if aspect != self.aspect {
            self.aspect = aspect;
            self.projection_dirty.set(true);
        }
    }

    pub fn view(&self) -> Mat4 {
        if self.view_dirty.replace(false) {
            self.view
                .set(Mat4::look_at_rh(self.position, self.position + self.front, self.up));
            self.rebuilds.set(self.rebuilds.get() + 1);
        }
        self.view.get()
    }

    pub fn projection(&self) -> Mat4 {
        if self.projection_dirty.replace(false) {
            self.projection.set(Mat4::perspective_rh(
                self.fov_y_radians,
                self.aspect,
                self.near,
                self.far,
            ));
            self.rebuilds.set(self.rebuilds.get() + 1);
        }
        self.projection.get()
    }

    /// Number of matrix rebuilds so far.
    pub fn rebuild_count(&self) -> u32 {
        self.rebuilds.get()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_radians
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    fn update_basis(&mut self) {
        let front = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();
        let right = front.cross(WORLD_UP).normalize();
        let up = right.cross(front).normalize();

        if front != self.front || right != self.right || up != self.up {
            self.front = front;
            self.right = right;
            self.up = up;
            self.view_dirty.set(true);
        }
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(
            &CameraSettings::default(),
            &ProjectionSettings::default(),
            16.0 / 9.0,
        )
    }

    #[test]
    fn default_yaw_looks_down_negative_z() {
        let cam = camera();
        assert!(cam.front().abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(cam.right().abs_diff_eq(Vec3::X, 1e-5));
        assert!(cam.up().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn matrices_are_cached_until_inputs_change() {
        let mut cam = camera();
        let _ = cam.view();
        let _ = cam.projection();
        assert_eq!(cam.rebuild_count(), 2);

        let _ = cam.view();
        let _ = cam.projection();
        assert_eq!(cam.rebuild_count(), 2);

        cam.set_aspect_ratio(16.0 / 9.0);
        let _ = cam.projection();
        assert_eq!(cam.rebuild_count(), 2);

        cam.set_aspect_ratio(4.0 / 3.0);
        let _ = cam.projection();
        assert_eq!(cam.rebuild_count(), 3);

        cam.process_movement(MoveDirection::Forward, 0.1);
        let _ = cam.view();
        assert_eq!(cam.rebuild_count(), 4);
    }

    #[test]
    fn zero_look_input_keeps_view_cached() {
        let mut cam = camera();
        let _ = cam.view();
        cam.process_look(0.0, 0.0);
        let _ = cam.view();
        assert_eq!(cam.rebuild_count(), 1);
    }

    #[test]
    fn vertical_movement_follows_world_up() {
        let mut cam = camera();
        cam.process_look(120.0, 80.0);
        let start = cam.position();
        cam.process_movement(MoveDirection::Up, 1.0);
        let moved = cam.position() - start;
        assert!(moved.abs_diff_eq(Vec3::Y * cam.speed(), 1e-5));
    }

    #[test]
    fn invalid_aspect_falls_back_to_square() {
        let mut cam = camera();
        cam.set_aspect_ratio(0.0);
        assert_eq!(cam.aspect(), 1.0);
    }
}
