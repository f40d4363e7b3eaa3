//! Recursive procedural generation over an explicit transform stack.
//!
//! Each node's matrix is parent x local; children receive the node's matrix
//! as their parent. Recursion carries only copied values (a matrix, a color,
//! a countdown), so traversal order can change without breaking anything and
//! nothing persists between draw calls.

use cgmath::{Deg, Matrix4, Quaternion, Rad, Rotation, Rotation3, vec3};

use crate::common::RgbaColor;

/// Children spawned per branch.
pub const BRANCH_CHILDREN: u32 = 4;
/// Distance along the local up axis from a branch's base to where its
/// children attach.
pub const BRANCH_LENGTH: f32 = 4.0;
/// Tilt of each child away from the parent's up axis.
pub const CHILD_TILT: f32 = std::f32::consts::FRAC_PI_4;
/// Uniform shrink factor per recursion level.
pub const CHILD_SCALE: f32 = 0.75;
/// Hue-like rotation applied to the color once per recursion level.
const COLOR_ROTATION_DEG: f32 = 22.5;

/// Total branches emitted for a tree of the given layer count:
/// 1 + 4 + 4^2 + ... + 4^layer.
pub fn branch_count(layer: u32) -> u64 {
    (0..=layer).map(|l| 4u64.pow(l)).sum()
}

/// The matrix drawing one branch segment from a unit cube.
///
/// The cube spans [-1, 1]; translating by one unit up first and then scaling
/// by (0.25, 2, 0.25) stretches it from the node origin to `BRANCH_LENGTH`
/// along local up. The other order would grow the branch from its center
/// instead of its base.
pub fn branch_matrix(parent: &Matrix4<f32>) -> Matrix4<f32> {
    parent
        * Matrix4::from_nonuniform_scale(0.25, 2.0, 0.25)
        * Matrix4::from_translation(vec3(0.0, 1.0, 0.0))
}

/// Rotates a color's RGB components by a fixed angle around the green axis.
/// Applied once per recursion level, so a branch's color is a deterministic
/// function of its path from the root.
pub fn rotate_color(color: RgbaColor) -> RgbaColor {
    let rotation: Quaternion<f32> = Quaternion::from_angle_y(Deg(COLOR_ROTATION_DEG));
    let rgb = rotation.rotate_vector(vec3(color.r, color.g, color.b));
    RgbaColor::new(rgb.x, rgb.y, rgb.z, color.a)
}

/// Emits one branch at `parent`, then recurses into `BRANCH_CHILDREN`
/// children until `layer` reaches zero.
///
/// Children sit at the parent's tip, fanned around the local up axis at 90
/// degree increments (offset by 45 degrees so no child lies in the parent's
/// tilt plane), tilted by [`CHILD_TILT`] and shrunk by [`CHILD_SCALE`].
///
/// The sink receives the fully composed matrix and the node color for exactly
/// one draw per node; callers typically pass a closure that issues a draw
/// with the view-projection matrix already folded into `parent`.
pub fn draw_tree(
    parent: Matrix4<f32>,
    color: RgbaColor,
    layer: u32,
    sink: &mut dyn FnMut(Matrix4<f32>, RgbaColor),
) {
    sink(branch_matrix(&parent), color);
    if layer == 0 {
        return;
    }

    for i in 0..BRANCH_CHILDREN {
        let swing = (2 * i + 1) as f32 * std::f32::consts::FRAC_PI_4;
        let child = parent
            * Matrix4::from_translation(vec3(0.0, BRANCH_LENGTH, 0.0))
            * Matrix4::from_angle_y(Rad(swing))
            * Matrix4::from_angle_z(Rad(CHILD_TILT))
            * Matrix4::from_scale(CHILD_SCALE);
        draw_tree(child, rotate_color(color), layer - 1, sink);
    }
}
