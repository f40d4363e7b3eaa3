//! Four cameras compositing into one framebuffer, plus an orthographic UI
//! pass with pointer picking.
//!
//! The main fly camera fills the surface; three fixed orthographic cameras
//! render scissored 100x100 sub-views; a fifth near-plane-at-zero camera
//! draws a spinning quad on top after a full-surface depth-only clear.
//! Clicking the quad toggles the animation time scale via the picking
//! unprojector.

use std::collections::HashMap;

use anyhow::Context as _;
use cgmath::{Matrix4, Point3, Rad, vec3};

use crate::camera::Camera;
use crate::common::{Rect, RgbaColor};
use crate::compositor::ViewportCompositor;
use crate::controller::FlyCameraController;
use crate::geom_query;
use crate::graphics::{GraphicsLayer, MeshId, ProgramId};
use crate::input::MouseButton;
use crate::loader::ResourceRequest;
use crate::mesh;
use crate::scene::{Scene, SceneContext};

use super::{COLOR_SHADER, color_shader_request};

/// Edge length of the fixed sub-views, in pixels.
const SUB_VIEW_SIZE: u32 = 100;

pub struct MultiViewScene {
    program: Option<ProgramId>,
    cube: Option<MeshId>,
    plane: Option<MeshId>,
    main_camera: Camera,
    top_camera: Camera,
    right_camera: Camera,
    front_camera: Camera,
    ui_camera: Camera,
    controller: Option<FlyCameraController>,
    compositor: ViewportCompositor,
    time: f32,
    pub(crate) time_scale: f32,
}

impl MultiViewScene {
    pub fn new() -> Self {
        Self {
            program: None,
            cube: None,
            plane: None,
            main_camera: Camera::new(),
            top_camera: Camera::new(),
            right_camera: Camera::new(),
            front_camera: Camera::new(),
            ui_camera: Camera::new(),
            controller: None,
            compositor: ViewportCompositor::new(),
            time: 0.0,
            time_scale: 1.0,
        }
    }

    /// Draws the animated cube field under the given view-projection matrix.
    /// Every cube pulses and cycles its tint on a phase derived from its grid
    /// position, so all views show the same world state.
    fn draw_cube_field(&self, gfx: &mut dyn GraphicsLayer, vp: Matrix4<f32>) {
        let (Some(program), Some(cube)) = (self.program, self.cube) else {
            return;
        };
        let third = 2.0 * std::f32::consts::PI / 3.0;

        let mut x = -12i32;
        while x <= 12 {
            let mut z = -12i32;
            while z <= 12 {
                let angle = (x + z) as f32 / 2.0 + self.time;
                let scale = (angle.sin() + 1.0) / 2.0;

                // Scale first, then translate: the matrix product applies the
                // rightmost transform to the cube first.
                let mvp = vp
                    * Matrix4::from_translation(vec3(x as f32, 0.0, z as f32))
                    * Matrix4::from_scale(scale);
                let tint = RgbaColor::new(
                    angle.cos(),
                    (angle + third).cos(),
                    (angle + 2.0 * third).cos(),
                    1.0,
                );
                gfx.draw(program, cube, mvp, tint);
                z += 2;
            }
            x += 2;
        }
    }

}

impl Default for MultiViewScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for MultiViewScene {
    fn load(&self) -> HashMap<String, ResourceRequest> {
        color_shader_request()
    }

    fn start(&mut self, ctx: &mut SceneContext) -> anyhow::Result<()> {
        let source = ctx
            .resources
            .text(COLOR_SHADER)
            .context("color shader resource missing")?;
        self.program = Some(ctx.gfx.create_program(source)?);
        self.cube = Some(ctx.gfx.create_mesh(&mesh::white_cube()));
        self.plane = Some(ctx.gfx.create_mesh(&mesh::colored_plane()));

        self.main_camera = Camera::new();
        self.main_camera.set_position(Point3::new(-3.0, 3.0, -3.0));
        self.main_camera.set_direction(vec3(3.0, -3.0, 3.0));
        self.main_camera.set_perspective(
            std::f32::consts::FRAC_PI_2,
            ctx.aspect(),
            0.01,
            1000.0,
        )?;

        let mut controller = FlyCameraController::new(&self.main_camera);
        controller.movement_sensitivity = 5.0;
        self.controller = Some(controller);

        // Top-down view; up points along +X so the grid fills the square.
        self.top_camera = Camera::new();
        self.top_camera.set_position(Point3::new(0.0, 3.0, 0.0));
        self.top_camera.set_direction(vec3(0.0, -1.0, 0.0));
        self.top_camera.set_up(vec3(1.0, 0.0, 0.0));
        self.top_camera.set_orthographic(18.0, 1.0, 0.01, 1000.0)?;

        self.right_camera = Camera::new();
        self.right_camera.set_position(Point3::new(3.0, 0.0, 0.0));
        self.right_camera.set_direction(vec3(-1.0, 0.0, 0.0));
        self.right_camera.set_orthographic(18.0, 1.0, 0.01, 1000.0)?;

        self.front_camera = Camera::new();
        self.front_camera.set_position(Point3::new(0.0, 0.0, 3.0));
        self.front_camera.set_direction(vec3(0.0, 0.0, -1.0));
        self.front_camera.set_orthographic(18.0, 1.0, 0.01, 1000.0)?;

        // The UI camera sits far back with near = 0 so the plane at the view
        // origin is inside the box.
        self.ui_camera = Camera::new();
        self.ui_camera.set_position(Point3::new(0.0, 0.0, 500.0));
        self.ui_camera.set_direction(vec3(0.0, 0.0, -1.0));
        self.ui_camera.set_orthographic(5.0, ctx.aspect(), 0.0, 501.0)?;

        ctx.gfx.set_cull_backfaces(true);
        ctx.gfx.set_depth_test(true);

        self.time = 0.0;
        self.time_scale = 1.0;

        Ok(())
    }

    fn draw(&mut self, ctx: &mut SceneContext, delta_time: f32) {
        let (Some(program), Some(plane)) = (self.program, self.plane) else {
            return;
        };
        self.time += delta_time * self.time_scale;
        if let Some(controller) = &mut self.controller {
            controller.update(&mut self.main_camera, ctx.input, delta_time);
        }

        let (width, height) = ctx.frame_size;

        // Main view over the whole surface, then the three scissored
        // sub-views on top of it.
        let state = self.compositor.begin_frame(ctx.gfx, width, height);
        let (mut state, vp) = self.compositor.render_region(
            ctx.gfx,
            state,
            Rect::full_surface(width, height),
            &self.main_camera,
            RgbaColor::BLACK,
            false,
        );
        if let Some(vp) = vp {
            self.draw_cube_field(ctx.gfx, vp);
        }

        let sub_views = [
            (
                Rect::new(0, 0, SUB_VIEW_SIZE, SUB_VIEW_SIZE),
                &self.top_camera,
                RgbaColor::new(0.5, 0.1, 0.1, 1.0),
            ),
            (
                Rect::new(0, SUB_VIEW_SIZE, SUB_VIEW_SIZE, SUB_VIEW_SIZE),
                &self.right_camera,
                RgbaColor::new(0.1, 0.5, 0.1, 1.0),
            ),
            (
                Rect::new(SUB_VIEW_SIZE, 0, SUB_VIEW_SIZE, SUB_VIEW_SIZE),
                &self.front_camera,
                RgbaColor::new(0.1, 0.1, 0.5, 1.0),
            ),
        ];

        for (rect, camera, clear) in sub_views {
            let (next, vp) =
                self.compositor
                    .render_region(ctx.gfx, state, rect, camera, clear, true);
            state = next;
            // Draw while this region's viewport and scissor are bound.
            if let Some(vp) = vp {
                self.draw_cube_field(ctx.gfx, vp);
            }
        }

        // UI pass: scissor off and a depth-only clear so the quad draws over
        // the scene everywhere while the colors underneath survive.
        let _state = self.compositor.full_surface(ctx.gfx, state);
        ctx.gfx.clear(None, true);

        let plane_matrix = self.ui_camera.view_projection_matrix()
            * Matrix4::from_translation(vec3(0.0, 4.0, 0.0))
            * Matrix4::from_angle_z(Rad(self.time));
        ctx.gfx
            .draw(program, plane, plane_matrix, RgbaColor::WHITE);

        // Click-to-toggle: unproject the pointer into the quad's local space
        // and pause/resume the animation on a hit.
        if ctx.input.is_button_just_pressed(MouseButton::Left)
            && geom_query::pick_unit_quad(
                ctx.input.cursor_position(),
                ctx.frame_size,
                plane_matrix,
            )
        {
            self.time_scale = 1.0 - self.time_scale;
        }
    }

    fn end(&mut self, ctx: &mut SceneContext) {
        if let Some(program) = self.program.take() {
            ctx.gfx.dispose_program(program);
        }
        if let Some(cube) = self.cube.take() {
            ctx.gfx.dispose_mesh(cube);
        }
        if let Some(plane) = self.plane.take() {
            ctx.gfx.dispose_mesh(plane);
        }
        self.controller = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::testing::{Command, RecordingGfx};
    use crate::input::{ElementState, Input};
    use crate::loader::{Resource, ResourceMap};

    fn test_resources() -> ResourceMap {
        let mut resources = ResourceMap::empty();
        resources.insert(COLOR_SHADER, Resource::Text("// shader".into()));
        resources
    }

    const FRAME: (u32, u32) = (800, 600);

    fn context<'a>(
        gfx: &'a mut RecordingGfx,
        input: &'a Input,
        resources: &'a ResourceMap,
    ) -> SceneContext<'a> {
        SceneContext {
            gfx,
            input,
            resources,
            frame_size: FRAME,
        }
    }

    fn started_scene(gfx: &mut RecordingGfx, input: &Input, resources: &ResourceMap) -> MultiViewScene {
        let mut scene = MultiViewScene::new();
        scene.start(&mut context(gfx, input, resources)).unwrap();
        scene
    }

    #[test]
    fn test_draws_cube_field_per_view_plus_ui_quad() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = started_scene(&mut gfx, &input, &resources);

        scene.draw(&mut context(&mut gfx, &input, &resources), 1.0 / 60.0);

        // 13 x 13 cubes in each of the 4 views, plus the UI quad.
        assert_eq!(gfx.draw_count(), 4 * 169 + 1);
    }

    #[test]
    fn test_depth_only_clear_runs_after_scissor_disabled() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = started_scene(&mut gfx, &input, &resources);

        gfx.clear_commands();
        scene.draw(&mut context(&mut gfx, &input, &resources), 1.0 / 60.0);

        let depth_only = gfx
            .position(|c| {
                matches!(
                    c,
                    Command::Clear {
                        color: None,
                        depth: true
                    }
                )
            })
            .expect("the UI pass must clear depth only");
        let last_disable = gfx
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Command::ScissorEnabled(false))
            .map(|(i, _)| i)
            .filter(|&i| i < depth_only)
            .next_back()
            .expect("scissor must be disabled before the depth-only clear");
        let last_enable = gfx
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Command::ScissorEnabled(true))
            .map(|(i, _)| i)
            .filter(|&i| i < depth_only)
            .next_back()
            .unwrap_or(0);
        assert!(
            last_enable < last_disable,
            "a still-enabled scissor would clip the depth clear to a sub-region"
        );
    }

    #[test]
    fn test_four_region_clears_per_frame_plus_depth_clear() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = started_scene(&mut gfx, &input, &resources);

        gfx.clear_commands();
        scene.draw(&mut context(&mut gfx, &input, &resources), 1.0 / 60.0);

        let color_clears = gfx
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Clear { color: Some(_), .. }))
            .count();
        let depth_only_clears = gfx
            .commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Command::Clear {
                        color: None,
                        depth: true
                    }
                )
            })
            .count();
        assert_eq!(color_clears, 4);
        assert_eq!(depth_only_clears, 1);
    }

    #[test]
    fn test_clicking_the_quad_toggles_time_scale() {
        let mut gfx = RecordingGfx::new();
        let resources = test_resources();
        let mut input = Input::new();
        let mut scene = started_scene(&mut gfx, &input, &resources);

        // With zero elapsed time the quad is axis-aligned at world (0, 4, 0).
        // Under the UI camera (half height 5, aspect 4/3) its center lands at
        // pixel (400, 60) in an 800x600 surface.
        input.on_cursor_moved((400.0, 60.0));
        input.on_mouse_input(ElementState::Pressed, MouseButton::Left);

        scene.draw(&mut context(&mut gfx, &input, &resources), 0.0);
        assert_eq!(scene.time_scale, 0.0);

        // A click far outside the quad leaves the scale untouched.
        input.end_frame();
        input.on_cursor_moved((10.0, 590.0));
        input.on_mouse_input(ElementState::Released, MouseButton::Left);
        input.on_mouse_input(ElementState::Pressed, MouseButton::Left);
        scene.draw(&mut context(&mut gfx, &input, &resources), 0.0);
        assert_eq!(scene.time_scale, 0.0);
    }

    #[test]
    fn test_end_disposes_all_gpu_resources() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = started_scene(&mut gfx, &input, &resources);

        gfx.clear_commands();
        scene.end(&mut context(&mut gfx, &input, &resources));

        let disposed_meshes = gfx
            .commands
            .iter()
            .filter(|c| matches!(c, Command::DisposeMesh(_)))
            .count();
        assert_eq!(disposed_meshes, 2);
        assert!(
            gfx.commands
                .iter()
                .any(|c| matches!(c, Command::DisposeProgram(_)))
        );
    }
}
