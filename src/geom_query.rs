//! Pointer-to-local-space unprojection and planar hit testing.
//!
//! A pick is an on-demand, per-frame query with no state of its own: given
//! the pointer position and an object's full model-view-projection matrix,
//! invert the transform chain and ask where the pointer lands in the object's
//! local space.

use cgmath::{Matrix4, Point3, SquareMatrix, Vector4};
use thiserror::Error;

use crate::common::EPSILON;

/// Failure modes of an unprojection. Both are recoverable: callers treat any
/// error as "no hit" rather than propagating a fatal condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickError {
    /// The object matrix has a near-zero determinant and cannot be inverted.
    #[error("object matrix is singular and cannot be inverted")]
    SingularTransform,

    /// The unprojected point's homogeneous w is near zero, so the perspective
    /// division is meaningless.
    #[error("unprojected point has a near-zero homogeneous coordinate")]
    DegenerateProjection,
}

/// Converts a pointer position in framebuffer pixels into the local space of
/// an object with the given model-view-projection matrix.
///
/// The pointer is normalized against the framebuffer size, remapped to
/// centered device coordinates in [-1, 1] x [-1, 1] (flipping Y, since pixel
/// space grows downward and device space grows upward), lifted to the
/// homogeneous point (x, y, 0, 1), transformed by the inverse of
/// `object_matrix`, and perspective-divided.
pub fn screen_to_local(
    pointer_pixel: (f32, f32),
    framebuffer_size: (u32, u32),
    object_matrix: Matrix4<f32>,
) -> Result<Point3<f32>, PickError> {
    let (width, height) = framebuffer_size;
    let u = pointer_pixel.0 / width as f32;
    let v = pointer_pixel.1 / height as f32;

    let device_x = (u - 0.5) * 2.0;
    let device_y = (v - 0.5) * -2.0;

    if object_matrix.determinant().abs() < EPSILON {
        return Err(PickError::SingularTransform);
    }
    let inverse = object_matrix
        .invert()
        .ok_or(PickError::SingularTransform)?;

    let local = inverse * Vector4::new(device_x, device_y, 0.0, 1.0);
    if local.w.abs() < EPSILON {
        return Err(PickError::DegenerateProjection);
    }

    Ok(Point3::new(
        local.x / local.w,
        local.y / local.w,
        local.z / local.w,
    ))
}

/// Whether a local-space point lies within the unit quad centered at the
/// origin in the XY plane (half-extent 0.5).
pub fn hit_unit_quad(local: Point3<f32>) -> bool {
    local.x.abs() <= 0.5 && local.y.abs() <= 0.5
}

/// Unprojects the pointer and tests it against the unit quad, treating any
/// degenerate transform as a miss.
pub fn pick_unit_quad(
    pointer_pixel: (f32, f32),
    framebuffer_size: (u32, u32),
    object_matrix: Matrix4<f32>,
) -> bool {
    screen_to_local(pointer_pixel, framebuffer_size, object_matrix)
        .map(hit_unit_quad)
        .unwrap_or(false)
}
