use std::cell::Cell;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};
use thiserror::Error;

use crate::common::EPSILON;

/// Matrix converting OpenGL clip-space depth [-1, 1] to the wgpu depth
/// range [0, 1].
///
/// cgmath builds projections with OpenGL conventions; composing this on the
/// left remaps `z' = 0.5 * z + 0.5 * w` so that post-divide depth lands in
/// [0, 1] (near → 0, far → 1). Every matrix produced by this crate uses the
/// wgpu convention.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Errors produced by camera parameter validation and view construction.
///
/// All variants are recoverable: callers skip the offending operation (or
/// fall back to an identity view) rather than aborting the frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CameraError {
    /// The view direction and up vector are parallel or zero-length, so the
    /// look-at basis cannot be orthogonalized.
    #[error("camera direction and up vector are parallel or zero-length")]
    DegenerateCamera,

    /// A projection parameter is out of range (non-positive fov/aspect/size,
    /// or near/far planes out of order).
    #[error("invalid projection parameters: {0}")]
    InvalidProjectionParameters(&'static str),
}

/// The projection half of a camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    /// Perspective frustum with a vertical field of view in radians.
    Perspective { fovy: f32 },
    /// Orthographic box extending `half_height` up/down and
    /// `half_height * aspect` left/right from the view axis.
    Orthographic { half_height: f32 },
}

/// A camera combining view parameters (position, direction, up) with
/// projection parameters (perspective or orthographic, aspect, clip planes).
///
/// The view-projection matrix is rebuilt lazily: every setter marks the
/// cached matrix stale, and [`Camera::view_projection_matrix`] recomputes it
/// only when something actually changed since the last query.
///
/// Cameras are created per scene at `start`, mutated every frame by a
/// controller, and discarded at scene `end`.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Point3<f32>,
    direction: Vector3<f32>,
    up: Vector3<f32>,
    projection: Projection,
    aspect: f32,
    near: f32,
    far: f32,

    cached_view_proj: Cell<Matrix4<f32>>,
    dirty: Cell<bool>,
}

impl Default for Camera {
    /// A safe identity-equivalent camera: one unit back from the origin,
    /// looking down -Z with a 90 degree perspective. An incompletely
    /// initialized scene can never feed undefined matrices to a draw call.
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            projection: Projection::Perspective {
                fovy: std::f32::consts::FRAC_PI_2,
            },
            aspect: 1.0,
            near: 0.01,
            far: 1000.0,
            cached_view_proj: Cell::new(Matrix4::identity()),
            dirty: Cell::new(true),
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to a perspective projection.
    ///
    /// Requires `fovy` in (0, pi), `aspect > 0` and `0 < near < far`; a
    /// perspective near plane at zero would put the projection's singularity
    /// inside the frustum.
    pub fn set_perspective(
        &mut self,
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), CameraError> {
        if !(fovy > 0.0 && fovy < std::f32::consts::PI) {
            return Err(CameraError::InvalidProjectionParameters(
                "fovy must be in (0, pi)",
            ));
        }
        if aspect <= 0.0 {
            return Err(CameraError::InvalidProjectionParameters(
                "aspect must be positive",
            ));
        }
        if !(near > 0.0 && near < far) {
            return Err(CameraError::InvalidProjectionParameters(
                "perspective requires 0 < near < far",
            ));
        }

        self.projection = Projection::Perspective { fovy };
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.invalidate();
        Ok(())
    }

    /// Switches to an orthographic projection sized `half_height` vertically
    /// and `half_height * aspect` horizontally.
    ///
    /// Requires `half_height > 0`, `aspect > 0` and `near < far`. A near
    /// plane at (or behind) zero is legal here; UI-style passes use near = 0
    /// to include the plane itself.
    pub fn set_orthographic(
        &mut self,
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), CameraError> {
        if half_height <= 0.0 {
            return Err(CameraError::InvalidProjectionParameters(
                "orthographic half height must be positive",
            ));
        }
        if aspect <= 0.0 {
            return Err(CameraError::InvalidProjectionParameters(
                "aspect must be positive",
            ));
        }
        if near >= far {
            return Err(CameraError::InvalidProjectionParameters(
                "near must be less than far",
            ));
        }

        self.projection = Projection::Orthographic { half_height };
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.invalidate();
        Ok(())
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.invalidate();
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        self.direction = direction;
        self.invalidate();
    }

    /// Points the camera at a world-space target.
    pub fn look_at(&mut self, target: Point3<f32>) {
        self.set_direction(target - self.position);
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn set_up(&mut self, up: Vector3<f32>) {
        self.up = up;
        self.invalidate();
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) -> Result<(), CameraError> {
        if aspect <= 0.0 {
            return Err(CameraError::InvalidProjectionParameters(
                "aspect must be positive",
            ));
        }
        self.aspect = aspect;
        self.invalidate();
        Ok(())
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// The camera's normalized forward vector.
    pub fn forward(&self) -> Vector3<f32> {
        self.direction.normalize()
    }

    /// The camera's normalized right vector.
    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(self.up).normalize()
    }

    /// Whether the look-at basis would degenerate: zero-length direction or
    /// up, or the two (anti-)parallel. The compositor skips regions bound to
    /// a degenerate camera.
    pub fn is_degenerate(&self) -> bool {
        self.direction.magnitude2() < EPSILON
            || self.up.magnitude2() < EPSILON
            || self.direction.cross(self.up).magnitude2() < EPSILON
    }

    /// Builds the view matrix from position, direction and up.
    ///
    /// A degenerate basis falls back to the identity matrix with a logged
    /// warning instead of producing NaNs; the frame survives.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        if self.is_degenerate() {
            log::warn!("degenerate camera basis, falling back to identity view");
            return Matrix4::identity();
        }
        Matrix4::look_to_rh(self.position, self.direction, self.up)
    }

    /// Builds the projection matrix in the wgpu depth convention.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let proj = match self.projection {
            Projection::Perspective { fovy } => {
                cgmath::perspective(Rad(fovy), self.aspect, self.near, self.far)
            }
            Projection::Orthographic { half_height } => {
                let half_width = half_height * self.aspect;
                cgmath::ortho(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }

    /// The combined projection x view matrix.
    ///
    /// Recomputed only when a setter ran since the last query; repeated calls
    /// on an unchanged camera return the cached matrix.
    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        if self.dirty.get() {
            let vp = self.projection_matrix() * self.view_matrix();
            self.cached_view_proj.set(vp);
            self.dirty.set(false);
        }
        self.cached_view_proj.get()
    }

    /// Marks the cached view-projection matrix stale. Called by every setter;
    /// public so external mutation paths can participate in the contract.
    pub fn invalidate(&mut self) {
        self.dirty.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector4, vec3};

    const TOLERANCE: f32 = 1e-5;

    /// Camera at the origin looking down -Z with a square 90 degree frustum.
    fn axis_camera(near: f32, far: f32) -> Camera {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(0.0, 0.0, 0.0));
        camera.set_direction(vec3(0.0, 0.0, -1.0));
        camera
            .set_perspective(std::f32::consts::FRAC_PI_2, 1.0, near, far)
            .unwrap();
        camera
    }

    fn project(camera: &Camera, point: Point3<f32>) -> (f32, f32, f32) {
        let clip = camera.view_projection_matrix()
            * Vector4::new(point.x, point.y, point.z, 1.0);
        (clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    // ===== Projection Depth Range Tests =====

    #[test]
    fn test_perspective_near_plane_maps_to_depth_zero() {
        let camera = axis_camera(1.0, 100.0);

        let (_, _, depth) = project(&camera, Point3::new(0.0, 0.0, -1.0));
        assert!(depth.abs() < TOLERANCE, "near-plane depth was {depth}");
    }

    #[test]
    fn test_perspective_far_plane_maps_to_depth_one() {
        let camera = axis_camera(1.0, 100.0);

        let (_, _, depth) = project(&camera, Point3::new(0.0, 0.0, -100.0));
        assert!((depth - 1.0).abs() < TOLERANCE, "far-plane depth was {depth}");
    }

    #[test]
    fn test_orthographic_depth_range() {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(0.0, 0.0, 0.0));
        camera.set_direction(vec3(0.0, 0.0, -1.0));
        camera.set_orthographic(2.0, 1.0, 1.0, 11.0).unwrap();

        let (_, _, near_depth) = project(&camera, Point3::new(0.0, 0.0, -1.0));
        let (_, _, far_depth) = project(&camera, Point3::new(0.0, 0.0, -11.0));

        assert!(near_depth.abs() < TOLERANCE);
        assert!((far_depth - 1.0).abs() < TOLERANCE);
    }

    // ===== View Matrix Tests =====

    #[test]
    fn test_view_matrix_rotation_block_is_orthonormal() {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(3.0, -2.0, 7.0));
        camera.set_direction(vec3(1.0, -0.5, 1.0));
        camera.set_up(vec3(0.0, 1.0, 0.0));

        let view = camera.view_matrix();
        let cols = [view.x.truncate(), view.y.truncate(), view.z.truncate()];

        for (i, col) in cols.iter().enumerate() {
            assert!(
                (col.magnitude() - 1.0).abs() < TOLERANCE,
                "column {i} is not unit length"
            );
        }
        assert!(cols[0].dot(cols[1]).abs() < TOLERANCE);
        assert!(cols[0].dot(cols[2]).abs() < TOLERANCE);
        assert!(cols[1].dot(cols[2]).abs() < TOLERANCE);
    }

    #[test]
    fn test_degenerate_direction_falls_back_to_identity() {
        let mut camera = Camera::new();
        camera.set_direction(vec3(0.0, 1.0, 0.0)); // parallel to up

        assert!(camera.is_degenerate());
        assert_eq!(camera.view_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_zero_length_up_is_degenerate() {
        let mut camera = Camera::new();
        camera.set_up(vec3(0.0, 0.0, 0.0));

        assert!(camera.is_degenerate());
    }

    // ===== Parameter Validation Tests =====

    #[test]
    fn test_perspective_rejects_zero_near() {
        let mut camera = Camera::new();
        let result = camera.set_perspective(1.0, 1.0, 0.0, 100.0);
        assert!(matches!(
            result,
            Err(CameraError::InvalidProjectionParameters(_))
        ));
    }

    #[test]
    fn test_perspective_rejects_inverted_planes() {
        let mut camera = Camera::new();
        let result = camera.set_perspective(1.0, 1.0, 10.0, 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_perspective_rejects_bad_fov_and_aspect() {
        let mut camera = Camera::new();
        assert!(camera.set_perspective(0.0, 1.0, 0.1, 10.0).is_err());
        assert!(
            camera
                .set_perspective(std::f32::consts::PI, 1.0, 0.1, 10.0)
                .is_err()
        );
        assert!(camera.set_perspective(1.0, -1.0, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_orthographic_allows_zero_near() {
        let mut camera = Camera::new();
        assert!(camera.set_orthographic(10.0, 1.0, 0.0, 501.0).is_ok());
    }

    #[test]
    fn test_orthographic_rejects_bad_parameters() {
        let mut camera = Camera::new();
        assert!(camera.set_orthographic(0.0, 1.0, 0.0, 1.0).is_err());
        assert!(camera.set_orthographic(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(camera.set_orthographic(1.0, 1.0, 5.0, 5.0).is_err());
    }

    #[test]
    fn test_failed_setter_keeps_previous_projection() {
        let mut camera = Camera::new();
        camera.set_perspective(1.0, 2.0, 0.5, 50.0).unwrap();
        let before = camera.view_projection_matrix();

        assert!(camera.set_perspective(-1.0, 2.0, 0.5, 50.0).is_err());
        assert_eq!(camera.view_projection_matrix(), before);
    }

    // ===== Orthographic Sizing Tests =====

    #[test]
    fn test_orthographic_half_extents_map_to_ndc_corners() {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(0.0, 0.0, 0.0));
        camera.set_direction(vec3(0.0, 0.0, -1.0));
        camera.set_orthographic(2.0, 2.0, 1.0, 10.0).unwrap();

        // Horizontal extent is half_height * aspect = 4, vertical is 2.
        let (x, y, _) = project(&camera, Point3::new(4.0, 2.0, -5.0));
        assert!((x - 1.0).abs() < TOLERANCE);
        assert!((y - 1.0).abs() < TOLERANCE);
    }

    // ===== Caching Tests =====

    #[test]
    fn test_view_projection_is_stable_without_mutation() {
        let camera = axis_camera(0.1, 100.0);
        assert_eq!(
            camera.view_projection_matrix(),
            camera.view_projection_matrix()
        );
    }

    #[test]
    fn test_setters_invalidate_cached_matrix() {
        let mut camera = axis_camera(0.1, 100.0);
        let before = camera.view_projection_matrix();

        camera.set_position(Point3::new(0.0, 5.0, 0.0));
        let after = camera.view_projection_matrix();

        assert_ne!(before, after);
    }

    // ===== On-Screen Scenario Test =====

    #[test]
    fn test_world_origin_is_on_screen_from_behind() {
        let mut camera = Camera::new();
        camera.set_position(Point3::new(0.0, 0.0, -3.0));
        camera.look_at(Point3::new(0.0, 0.0, 0.0));
        camera.set_up(vec3(0.0, 1.0, 0.0));
        camera
            .set_perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.01, 1000.0)
            .unwrap();

        let (x, y, _) = project(&camera, Point3::new(0.0, 0.0, 0.0));
        assert!((-1.0..=1.0).contains(&x), "x = {x}");
        assert!((-1.0..=1.0).contains(&y), "y = {y}");
    }
}
