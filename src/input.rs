//! Input state, independent of any specific windowing library.
//!
//! The windowing layer feeds events in through the `on_*` methods; scenes and
//! controllers read the aggregate state through the query methods. Edge
//! queries ("just pressed") hold for exactly one frame and are reset by
//! [`Input::end_frame`], which the host calls after every draw.

use std::collections::HashSet;

/// Element state (pressed or released).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Logical key, with consideration for layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Named(NamedKey),
    Character(char),
    Unidentified,
}

/// Named keyboard keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Shift,
    Control,
    Alt,
}

/// Aggregate input state for one window.
#[derive(Debug, Default)]
pub struct Input {
    cursor_position: (f32, f32),
    mouse_delta: (f32, f32),
    buttons_down: HashSet<MouseButton>,
    buttons_just_pressed: HashSet<MouseButton>,
    keys_down: HashSet<Key>,
    keys_just_pressed: HashSet<Key>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    // Queries

    /// Current pointer position in framebuffer pixels, top-left origin.
    pub fn cursor_position(&self) -> (f32, f32) {
        self.cursor_position
    }

    /// Accumulated relative mouse motion since the last `end_frame`.
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// True only on the frame the button transitioned to pressed.
    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.buttons_just_pressed.contains(&button)
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the frame the key transitioned to pressed.
    pub fn is_key_just_pressed(&self, key: Key) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    // Event feeds

    pub fn on_cursor_moved(&mut self, position: (f32, f32)) {
        self.cursor_position = position;
    }

    pub fn on_mouse_motion(&mut self, delta: (f32, f32)) {
        self.mouse_delta.0 += delta.0;
        self.mouse_delta.1 += delta.1;
    }

    pub fn on_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        match state {
            ElementState::Pressed => {
                // Key-repeat style duplicates must not retrigger the edge.
                if self.buttons_down.insert(button) {
                    self.buttons_just_pressed.insert(button);
                }
            }
            ElementState::Released => {
                self.buttons_down.remove(&button);
            }
        }
    }

    pub fn on_key_input(&mut self, state: ElementState, key: Key) {
        match state {
            ElementState::Pressed => {
                if self.keys_down.insert(key) {
                    self.keys_just_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    /// Clears the per-frame edge state. Call once per frame, after the scene
    /// has drawn.
    pub fn end_frame(&mut self) {
        self.buttons_just_pressed.clear();
        self.keys_just_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }
}
