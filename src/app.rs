// app.rs
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::error::StartupError;
use crate::input::InputState;
use crate::renderer::Renderer;
use crate::scene::{Camera, SceneBatch, SkyboxFaces};
use crate::settings::AppConfig;
use crate::time::FrameClock;

/// Window, renderer and fly camera driven by the winit event loop.
pub struct App {
    config: AppConfig,
    batch: SceneBatch,
    sky: SkyboxFaces,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    camera: Option<Camera>,
    input: InputState,
    clock: FrameClock,
    failure: Option<StartupError>,
}

impl App {
    pub fn new(config: AppConfig, batch: SceneBatch, sky: SkyboxFaces) -> Self {
        Self {
            config,
            batch,
            sky,
            window: None,
            renderer: None,
            camera: None,
            input: InputState::new(),
            clock: FrameClock::new(),
            failure: None,
        }
    }

    /// The error that ended the event loop, if any.
    pub fn into_result(self) -> Result<(), StartupError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: StartupError) {
        log::error!("{}", err);
        self.failure = Some(err);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), StartupError> {
        let attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        capture_cursor(&window);

        let renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &self.config,
            &self.batch,
            &self.sky,
        ))?;
        let camera = Camera::new(
            &self.config.camera,
            &self.config.projection,
            renderer.aspect_ratio(),
        );

        window.request_redraw();
        self.clock = FrameClock::new();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.camera = Some(camera);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), StartupError> {
        let (Some(renderer), Some(camera)) = (self.renderer.as_mut(), self.camera.as_mut()) else {
            return Ok(());
        };

        let dt = self.clock.tick();
        for direction in self.input.held_directions() {
            camera.process_movement(direction, dt);
        }
        let (dx, dy) = self.input.take_look();
        if dx != 0.0 || dy != 0.0 {
            camera.process_look(dx, dy);
        }
        let scroll = self.input.take_scroll();
        if scroll != 0.0 {
            camera.process_speed_change(scroll, dt);
        }

        renderer.update(camera);
        let applied = renderer.render()?;
        sync_aspect(camera, applied);

        if self.clock.frames() % 600 == 0 {
            log::debug!(
                "Frame {}: camera at {:?}, speed {:.2}",
                self.clock.frames(),
                camera.position(),
                camera.speed()
            );
        }
        Ok(())
    }
}

/// Follows the attachments to a new size. Ignored and still-deferred
/// requests leave the projection alone.
fn sync_aspect(camera: &mut Camera, applied: Option<PhysicalSize<u32>>) {
    if let Some(size) = applied {
        camera.set_aspect_ratio(size.width as f32 / size.height.max(1) as f32);
    }
}

fn capture_cursor(window: &Window) {
    if window.set_cursor_grab(CursorGrabMode::Locked).is_err() {
        if let Err(err) = window.set_cursor_grab(CursorGrabMode::Confined) {
            log::warn!("Cursor could not be captured: {}", err);
        }
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let (Some(renderer), Some(camera)) = (self.renderer.as_mut(), self.camera.as_mut())
                else {
                    return;
                };
                match renderer.resize(size) {
                    Ok(applied) => sync_aspect(camera, applied),
                    Err(err) => self.fail(event_loop, err.into()),
                }
            }
            WindowEvent::Focused(focused) => {
                self.input.on_focus(focused);
                if focused {
                    capture_cursor(&window);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    event_loop.exit();
                } else {
                    self.input.on_key(code, state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.on_scroll(delta);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.on_mouse_motion(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ResizeGate;
    use crate::settings::{CameraSettings, ProjectionSettings};

    fn camera() -> Camera {
        Camera::new(&CameraSettings::default(), &ProjectionSettings::default(), 4.0 / 3.0)
    }

    #[test]
    fn resize_applied_after_a_frame_updates_the_projection() {
        let mut camera = camera();
        let mut gate = ResizeGate::new(800, 600);
        let before = camera.projection();

        gate.begin_pass();
        let immediate = gate.request(1920, 1080).map(|(w, h)| PhysicalSize::new(w, h));
        sync_aspect(&mut camera, immediate);
        assert_eq!(camera.aspect(), 4.0 / 3.0);

        let deferred = gate.end_pass().map(|(w, h)| PhysicalSize::new(w, h));
        sync_aspect(&mut camera, deferred);

        assert!((camera.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_ne!(camera.projection(), before);
    }

    #[test]
    fn ignored_resize_keeps_the_aspect() {
        let mut camera = camera();
        let rebuilds = {
            camera.projection();
            camera.rebuild_count()
        };

        sync_aspect(&mut camera, None);

        camera.projection();
        assert_eq!(camera.rebuild_count(), rebuilds);
        assert_eq!(camera.aspect(), 4.0 / 3.0);
    }
}
