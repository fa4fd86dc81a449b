//! Keyboard and mouse state gathered from window events

use std::hash::Hash;

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pressed / just-pressed / just-released sets for one kind of button
#[derive(Debug)]
struct Buttons<T> {
    held: FxHashSet<T>,
    pressed: FxHashSet<T>,
    released: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> Buttons<T> {
    fn new() -> Self {
        Self {
            held: FxHashSet::default(),
            pressed: FxHashSet::default(),
            released: FxHashSet::default(),
        }
    }

    fn apply(&mut self, button: T, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(button) {
                    self.pressed.insert(button);
                }
            }
            ElementState::Released => {
                self.held.remove(&button);
                self.released.insert(button);
            }
        }
    }

    /// Release everything held, as if each button went up this frame
    fn release_all(&mut self) {
        self.released.extend(self.held.drain());
    }

    fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

/// Input state for the current frame
#[derive(Debug)]
pub struct Input {
    keys: Buttons<KeyCode>,
    mouse: Buttons<MouseButton>,
    cursor: Vec2,
    cursor_delta: Vec2,
    scroll: Vec2,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Buttons::new(),
            mouse: Buttons::new(),
            cursor: Vec2::ZERO,
            cursor_delta: Vec2::ZERO,
            scroll: Vec2::ZERO,
        }
    }

    /// Feed a window event. Returns whether it was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.process_key(code, event.state);
                }
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse.apply(*button, *state);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.process_cursor(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::Focused(false) => {
                // the matching releases go to whichever window has focus now
                self.keys.release_all();
                self.mouse.release_all();
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll += match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(p) => Vec2::new(p.x as f32, p.y as f32) / 120.0,
                };
                true
            }
            _ => false,
        }
    }

    /// Whether `event` lets go of a key or mouse button
    #[must_use]
    pub fn is_release(event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => event.state == ElementState::Released,
            WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
            _ => false,
        }
    }

    pub fn process_key(&mut self, key: KeyCode, state: ElementState) {
        self.keys.apply(key, state);
    }

    pub fn process_cursor(&mut self, position: Vec2) {
        self.cursor_delta += position - self.cursor;
        self.cursor = position;
    }

    /// Clear per-frame state; call once the frame has been processed
    pub fn end_frame(&mut self) {
        self.keys.end_frame();
        self.mouse.end_frame();
        self.cursor_delta = Vec2::ZERO;
        self.scroll = Vec2::ZERO;
    }

    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.held.contains(&key)
    }

    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys.pressed.contains(&key)
    }

    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keys.released.contains(&key)
    }

    #[must_use]
    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.held.contains(&button)
    }

    #[must_use]
    pub fn is_mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.mouse.pressed.contains(&button)
    }

    #[must_use]
    pub const fn cursor_position(&self) -> Vec2 {
        self.cursor
    }

    #[must_use]
    pub const fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    #[must_use]
    pub const fn scroll_delta(&self) -> Vec2 {
        self.scroll
    }

    /// -1, 0 or 1 depending on which of the two keys is held
    #[must_use]
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        f32::from(u8::from(self.is_key_pressed(positive)))
            - f32::from(u8::from(self.is_key_pressed(negative)))
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_lifecycle() {
        let mut input = Input::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        input.end_frame();
        // key repeat does not count as a new press
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));

        input.process_key(KeyCode::KeyW, ElementState::Released);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_released(KeyCode::KeyW));
    }

    #[test]
    fn test_cursor_delta_accumulates_until_end_of_frame() {
        let mut input = Input::new();
        input.process_cursor(Vec2::new(10.0, 0.0));
        input.process_cursor(Vec2::new(15.0, 5.0));
        assert_eq!(input.cursor_delta(), Vec2::new(15.0, 5.0));
        input.end_frame();
        assert_eq!(input.cursor_delta(), Vec2::ZERO);
        assert_eq!(input.cursor_position(), Vec2::new(15.0, 5.0));
    }

    #[test]
    fn test_focus_loss_releases_held_buttons() {
        let mut input = Input::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        input.mouse.apply(MouseButton::Right, ElementState::Pressed);
        input.end_frame();

        assert!(input.handle_window_event(&WindowEvent::Focused(false)));
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_released(KeyCode::KeyW));
        assert!(!input.is_mouse_pressed(MouseButton::Right));

        input.end_frame();
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_released(KeyCode::KeyW));
    }

    #[test]
    fn test_focus_gain_keeps_state() {
        let mut input = Input::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(!input.handle_window_event(&WindowEvent::Focused(true)));
        assert!(input.is_key_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_axis() {
        let mut input = Input::new();
        assert_eq!(input.axis(KeyCode::KeyA, KeyCode::KeyD), 0.0);
        input.process_key(KeyCode::KeyD, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyA, KeyCode::KeyD), 1.0);
        input.process_key(KeyCode::KeyA, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyA, KeyCode::KeyD), 0.0);
    }
}
