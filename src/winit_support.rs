//! Winit integration: conversion functions from winit types to the crate's
//! input types, plus helpers feeding winit events into an [`Input`].
//!
//! Only compiled when the `winit-support` feature is enabled.

use crate::input::{ElementState, Input, Key, MouseButton, NamedKey};

/// Converts a winit ElementState to our ElementState.
pub fn convert_element_state(state: winit::event::ElementState) -> ElementState {
    match state {
        winit::event::ElementState::Pressed => ElementState::Pressed,
        winit::event::ElementState::Released => ElementState::Released,
    }
}

/// Converts a winit MouseButton to our MouseButton.
pub fn convert_mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Back,
        winit::event::MouseButton::Forward => MouseButton::Forward,
        winit::event::MouseButton::Other(id) => MouseButton::Other(id),
    }
}

/// Converts a winit logical key to our Key. Characters are lowercased so key
/// bindings are case-insensitive under Shift.
pub fn convert_key(key: &winit::keyboard::Key) -> Key {
    match key {
        winit::keyboard::Key::Named(named) => match convert_named_key(*named) {
            Some(named) => Key::Named(named),
            None => Key::Unidentified,
        },
        winit::keyboard::Key::Character(s) => match s.chars().next() {
            Some(c) => Key::Character(c.to_ascii_lowercase()),
            None => Key::Unidentified,
        },
        _ => Key::Unidentified,
    }
}

/// Converts the named keys the sandbox cares about (partial mapping).
fn convert_named_key(key: winit::keyboard::NamedKey) -> Option<NamedKey> {
    use winit::keyboard::NamedKey as WK;
    match key {
        WK::Escape => Some(NamedKey::Escape),
        WK::Enter => Some(NamedKey::Enter),
        WK::Tab => Some(NamedKey::Tab),
        WK::Backspace => Some(NamedKey::Backspace),
        WK::Space => Some(NamedKey::Space),
        WK::ArrowLeft => Some(NamedKey::ArrowLeft),
        WK::ArrowRight => Some(NamedKey::ArrowRight),
        WK::ArrowUp => Some(NamedKey::ArrowUp),
        WK::ArrowDown => Some(NamedKey::ArrowDown),
        WK::Shift => Some(NamedKey::Shift),
        WK::Control => Some(NamedKey::Control),
        WK::Alt => Some(NamedKey::Alt),
        _ => None,
    }
}

/// Feeds a winit window event into the input state. Returns `true` if the
/// event was consumed as input.
pub fn apply_window_event(input: &mut Input, event: &winit::event::WindowEvent) -> bool {
    use winit::event::WindowEvent;

    match event {
        WindowEvent::CursorMoved { position, .. } => {
            input.on_cursor_moved((position.x as f32, position.y as f32));
            true
        }
        WindowEvent::MouseInput { state, button, .. } => {
            input.on_mouse_input(convert_element_state(*state), convert_mouse_button(*button));
            true
        }
        WindowEvent::KeyboardInput { event, .. } => {
            if !event.repeat {
                input.on_key_input(
                    convert_element_state(event.state),
                    convert_key(&event.logical_key),
                );
            }
            true
        }
        _ => false,
    }
}

/// Feeds a winit device event (relative mouse motion) into the input state.
pub fn apply_device_event(input: &mut Input, event: &winit::event::DeviceEvent) -> bool {
    match event {
        winit::event::DeviceEvent::MouseMotion { delta } => {
            input.on_mouse_motion((delta.0 as f32, delta.1 as f32));
            true
        }
        _ => false,
    }
}
