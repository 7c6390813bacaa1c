//! Frame-coherent input accumulation for the fly camera.
//!
//! Window and device events are folded in as they arrive; the frame loop
//! then drains the accumulated look and scroll deltas once per frame.

use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta};
use winit::keyboard::KeyCode;

use crate::scene::MoveDirection;

const MOVEMENT_KEYS: [(KeyCode, MoveDirection); 6] = [
    (KeyCode::KeyW, MoveDirection::Forward),
    (KeyCode::KeyS, MoveDirection::Backward),
    (KeyCode::KeyA, MoveDirection::Left),
    (KeyCode::KeyD, MoveDirection::Right),
    (KeyCode::Space, MoveDirection::Up),
    (KeyCode::ControlLeft, MoveDirection::Down),
];

/// Pixels of a precise scroll that count as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    look: (f32, f32),
    scroll: f32,
    skip_next_motion: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            skip_next_motion: true,
            ..Self::default()
        }
    }

    pub fn on_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.held.insert(key);
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// Raw device motion. The first event after (re)gaining focus is dropped
    /// because it carries the jump from wherever the pointer was.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.skip_next_motion {
            self.skip_next_motion = false;
            return;
        }
        self.look.0 += dx as f32;
        self.look.1 += dy as f32;
    }

    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
        };
    }

    pub fn on_focus(&mut self, focused: bool) {
        if focused {
            self.skip_next_motion = true;
        } else {
            self.held.clear();
        }
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn held_directions(&self) -> impl Iterator<Item = MoveDirection> + '_ {
        MOVEMENT_KEYS
            .iter()
            .filter(|(key, _)| self.held.contains(key))
            .map(|&(_, direction)| direction)
    }

    /// Drains the look delta with screen-down flipped to look-down.
    pub fn take_look(&mut self) -> (f32, f32) {
        let (dx, dy) = std::mem::take(&mut self.look);
        (dx, -dy)
    }

    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_directions() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyW, ElementState::Pressed);
        input.on_key(KeyCode::Space, ElementState::Pressed);
        input.on_key(KeyCode::KeyQ, ElementState::Pressed);

        let directions: Vec<_> = input.held_directions().collect();
        assert_eq!(directions, vec![MoveDirection::Forward, MoveDirection::Up]);

        input.on_key(KeyCode::KeyW, ElementState::Released);
        assert_eq!(input.held_directions().count(), 1);
    }

    #[test]
    fn first_motion_after_focus_is_ignored() {
        let mut input = InputState::new();
        input.on_mouse_motion(500.0, 300.0);
        input.on_mouse_motion(2.0, 3.0);
        input.on_mouse_motion(1.0, 1.0);
        assert_eq!(input.take_look(), (3.0, -4.0));
        assert_eq!(input.take_look(), (0.0, 0.0));

        input.on_focus(true);
        input.on_mouse_motion(100.0, 100.0);
        assert_eq!(input.take_look(), (0.0, 0.0));
    }

    #[test]
    fn losing_focus_releases_keys() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyD, ElementState::Pressed);
        input.on_focus(false);
        assert!(!input.is_held(KeyCode::KeyD));
    }

    #[test]
    fn scroll_accumulates_lines_and_pixels() {
        let mut input = InputState::new();
        input.on_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.on_scroll(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, 80.0),
        ));
        assert_eq!(input.take_scroll(), 3.0);
        assert_eq!(input.take_scroll(), 0.0);
    }
}
