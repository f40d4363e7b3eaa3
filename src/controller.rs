//! Fly-style camera controller: WASD/QE movement along the camera basis and
//! mouse look while the right button is held.

use cgmath::{InnerSpace, vec3};

use crate::camera::Camera;
use crate::input::{Input, Key, MouseButton, NamedKey};

/// Pitch is clamped just under 90 degrees to avoid a gimbal-locked basis.
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Mutates a camera every frame from the aggregate input state.
///
/// The controller keeps its own yaw/pitch (seeded from the camera's starting
/// direction) and writes back through the camera's invalidating setters, so
/// the cached view-projection matrix always follows.
pub struct FlyCameraController {
    /// Movement speed in world units per second.
    pub movement_sensitivity: f32,
    /// Look speed in radians per pixel of mouse motion.
    pub rotation_sensitivity: f32,
    /// Speed multiplier while Shift is held.
    pub fast_multiplier: f32,
    yaw: f32,
    pitch: f32,
}

impl FlyCameraController {
    /// Creates a controller seeded from the camera's current direction.
    pub fn new(camera: &Camera) -> Self {
        let dir = camera.direction().normalize();
        Self {
            movement_sensitivity: 5.0,
            rotation_sensitivity: 0.002,
            fast_multiplier: 5.0,
            yaw: f32::atan2(dir.x, -dir.z),
            pitch: dir.y.asin().clamp(-MAX_PITCH, MAX_PITCH),
        }
    }

    /// Applies one frame of look and movement to the camera.
    pub fn update(&mut self, camera: &mut Camera, input: &Input, delta_time: f32) {
        if input.is_button_down(MouseButton::Right) {
            let (dx, dy) = input.mouse_delta();
            self.yaw += dx * self.rotation_sensitivity;
            self.pitch =
                (self.pitch - dy * self.rotation_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);

            camera.set_direction(vec3(
                self.pitch.cos() * self.yaw.sin(),
                self.pitch.sin(),
                -self.pitch.cos() * self.yaw.cos(),
            ));
        }

        let mut movement = vec3(0.0, 0.0, 0.0);
        let forward = camera.forward();
        let right = camera.right();
        let up = vec3(0.0, 1.0, 0.0);

        if input.is_key_down(Key::Character('w')) {
            movement += forward;
        }
        if input.is_key_down(Key::Character('s')) {
            movement -= forward;
        }
        if input.is_key_down(Key::Character('d')) {
            movement += right;
        }
        if input.is_key_down(Key::Character('a')) {
            movement -= right;
        }
        if input.is_key_down(Key::Character('e')) {
            movement += up;
        }
        if input.is_key_down(Key::Character('q')) {
            movement -= up;
        }

        if movement.magnitude2() > 0.0 {
            let mut speed = self.movement_sensitivity;
            if input.is_key_down(Key::Named(NamedKey::Shift)) {
                speed *= self.fast_multiplier;
            }
            let position = camera.position() + movement.normalize() * speed * delta_time;
            camera.set_position(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ElementState;
    use cgmath::Point3;

    const TOLERANCE: f32 = 1e-5;

    fn camera_facing_minus_z() -> Camera {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(0.0, 0.0, 0.0));
        camera.set_direction(vec3(0.0, 0.0, -1.0));
        camera
    }

    #[test]
    fn test_w_moves_along_forward() {
        let mut camera = camera_facing_minus_z();
        let mut controller = FlyCameraController::new(&camera);
        controller.movement_sensitivity = 2.0;

        let mut input = Input::new();
        input.on_key_input(ElementState::Pressed, Key::Character('w'));

        controller.update(&mut camera, &input, 0.5);

        let p = camera.position();
        assert!(p.x.abs() < TOLERANCE);
        assert!(p.y.abs() < TOLERANCE);
        assert!((p.z - -1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut camera = camera_facing_minus_z();
        let mut controller = FlyCameraController::new(&camera);

        let mut input = Input::new();
        input.on_key_input(ElementState::Pressed, Key::Character('w'));
        input.on_key_input(ElementState::Pressed, Key::Character('s'));

        controller.update(&mut camera, &input, 1.0);
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_shift_scales_speed() {
        let mut camera = camera_facing_minus_z();
        let mut controller = FlyCameraController::new(&camera);
        controller.movement_sensitivity = 1.0;
        controller.fast_multiplier = 4.0;

        let mut input = Input::new();
        input.on_key_input(ElementState::Pressed, Key::Character('e'));
        input.on_key_input(ElementState::Pressed, Key::Named(NamedKey::Shift));

        controller.update(&mut camera, &input, 1.0);
        assert!((camera.position().y - 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_mouse_look_requires_right_button() {
        let mut camera = camera_facing_minus_z();
        let mut controller = FlyCameraController::new(&camera);
        let before = camera.direction();

        let mut input = Input::new();
        input.on_mouse_motion((100.0, 0.0));
        controller.update(&mut camera, &input, 0.016);
        assert_eq!(camera.direction(), before);

        input.on_mouse_input(ElementState::Pressed, MouseButton::Right);
        controller.update(&mut camera, &input, 0.016);
        assert!(camera.direction() != before);
    }

    #[test]
    fn test_pitch_is_clamped_short_of_vertical() {
        let mut camera = camera_facing_minus_z();
        let mut controller = FlyCameraController::new(&camera);

        let mut input = Input::new();
        input.on_mouse_input(ElementState::Pressed, MouseButton::Right);
        input.on_mouse_motion((0.0, -100_000.0));

        controller.update(&mut camera, &input, 0.016);

        let dir = camera.direction().normalize();
        assert!(dir.y < 1.0, "camera must never look straight up");
        assert!(!camera.is_degenerate());
    }

    #[test]
    fn test_seeded_yaw_pitch_reproduces_direction() {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(-20.0, 10.0, -20.0));
        camera.set_direction(vec3(1.0, -0.5, 1.0));
        let mut controller = FlyCameraController::new(&camera);

        // A look update with zero mouse delta must keep the direction.
        let before = camera.direction().normalize();
        let mut input = Input::new();
        input.on_mouse_input(ElementState::Pressed, MouseButton::Right);
        controller.update(&mut camera, &input, 0.016);
        let after = camera.direction().normalize();

        assert!((before.dot(after) - 1.0).abs() < 1e-4);
    }
}
