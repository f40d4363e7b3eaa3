//! Viewport/scissor multiplexing: several cameras rendering into disjoint
//! regions of one framebuffer within a single frame.
//!
//! Raster state is threaded through every call as an explicit [`RasterState`]
//! value instead of living as ambient GPU globals, so the ordering invariants
//! (notably "disable scissor before any full-surface operation") can be
//! asserted against a recorded command stream without a GPU context.

use cgmath::Matrix4;

use crate::camera::Camera;
use crate::common::{Rect, RgbaColor};
use crate::graphics::GraphicsLayer;

/// The raster state relevant to compositing: where NDC maps to, and which
/// pixels raster operations may touch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RasterState {
    pub viewport: Rect,
    pub scissor: Rect,
    pub scissor_enabled: bool,
}

impl RasterState {
    /// Full-surface state with scissoring off.
    pub fn full_surface(width: u32, height: u32) -> Self {
        let full = Rect::full_surface(width, height);
        Self {
            viewport: full,
            scissor: full,
            scissor_enabled: false,
        }
    }
}

/// Partitions the framebuffer into camera-bound regions, each independently
/// cleared and scissor-clipped.
///
/// Regions are processed in caller order and carry no identity across frames.
/// Overlap between regions is allowed by contract: later regions simply
/// overwrite earlier pixels, which callers use deliberately (e.g. inset
/// sub-views over a full-surface main view).
#[derive(Debug)]
pub struct ViewportCompositor {
    frame: Rect,
}

impl ViewportCompositor {
    pub fn new() -> Self {
        Self {
            frame: Rect::full_surface(0, 0),
        }
    }

    /// Starts a frame: resets viewport and scissor to the full surface with
    /// scissoring disabled, making no assumptions about clear colors.
    ///
    /// The full-framebuffer region (typically the background clear) must be
    /// issued before any sub-region clear in the same frame.
    pub fn begin_frame(
        &mut self,
        gfx: &mut dyn GraphicsLayer,
        width: u32,
        height: u32,
    ) -> RasterState {
        self.frame = Rect::full_surface(width, height);
        let state = RasterState::full_surface(width, height);

        gfx.set_scissor_enabled(false);
        gfx.set_viewport(state.viewport);
        gfx.set_scissor(state.scissor);

        state
    }

    /// Binds a region: sets the viewport (and scissor, when requested) to
    /// `rect`, clears it to `clear_color` plus a depth clear, and hands back
    /// the camera's view-projection matrix for the caller's draws.
    ///
    /// A degenerate camera skips the region entirely: no raster command is
    /// issued and `None` is returned, so a bad camera costs one sub-view, not
    /// the frame.
    pub fn render_region(
        &mut self,
        gfx: &mut dyn GraphicsLayer,
        state: RasterState,
        rect: Rect,
        camera: &Camera,
        clear_color: RgbaColor,
        use_scissor: bool,
    ) -> (RasterState, Option<Matrix4<f32>>) {
        if camera.is_degenerate() {
            log::warn!("skipping viewport region bound to a degenerate camera");
            return (state, None);
        }

        let rect = rect.intersection(&self.frame);
        let mut state = state;

        state.viewport = rect;
        gfx.set_viewport(rect);

        if use_scissor {
            // Scissor must be in place before the clear: without it, the
            // clear would touch the whole surface.
            state.scissor = rect;
            state.scissor_enabled = true;
            gfx.set_scissor(rect);
            gfx.set_scissor_enabled(true);
        } else if state.scissor_enabled {
            state.scissor_enabled = false;
            gfx.set_scissor_enabled(false);
        }

        gfx.clear(Some(clear_color), true);

        (state, Some(camera.view_projection_matrix()))
    }

    /// Returns to full-surface rendering: disables the scissor test and
    /// restores the full viewport and scissor rectangles.
    ///
    /// This must run before any operation meant to affect the whole surface
    /// (such as a depth-only clear between a 3D pass and a UI pass);
    /// otherwise that operation is silently clipped to the last sub-region.
    pub fn full_surface(
        &mut self,
        gfx: &mut dyn GraphicsLayer,
        state: RasterState,
    ) -> RasterState {
        let mut state = state;

        if state.scissor_enabled {
            state.scissor_enabled = false;
            gfx.set_scissor_enabled(false);
        }
        state.viewport = self.frame;
        state.scissor = self.frame;
        gfx.set_viewport(self.frame);
        gfx.set_scissor(self.frame);

        state
    }
}

impl Default for ViewportCompositor {
    fn default() -> Self {
        Self::new()
    }
}
