//! A grid of colored cubes drawn from a fly camera, demonstrating repeated
//! model transforms against one view-projection matrix plus depth testing
//! and back-face culling.

use std::collections::HashMap;

use anyhow::Context as _;
use cgmath::{Matrix4, Point3, vec3};

use crate::camera::Camera;
use crate::common::{Rect, RgbaColor};
use crate::compositor::ViewportCompositor;
use crate::controller::FlyCameraController;
use crate::graphics::{MeshId, ProgramId};
use crate::loader::ResourceRequest;
use crate::mesh;
use crate::scene::{Scene, SceneContext};

use super::{COLOR_SHADER, color_shader_request};

/// Grid extent: cubes at every third unit of [-12, 12] on X and Z.
const GRID_STEP: i32 = 3;
const GRID_HALF_EXTENT: i32 = 12;

pub struct GridScene {
    program: Option<ProgramId>,
    cube: Option<MeshId>,
    camera: Camera,
    controller: Option<FlyCameraController>,
    compositor: ViewportCompositor,
}

impl GridScene {
    pub fn new() -> Self {
        Self {
            program: None,
            cube: None,
            camera: Camera::new(),
            controller: None,
            compositor: ViewportCompositor::new(),
        }
    }
}

impl Default for GridScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for GridScene {
    fn load(&self) -> HashMap<String, ResourceRequest> {
        color_shader_request()
    }

    fn start(&mut self, ctx: &mut SceneContext) -> anyhow::Result<()> {
        let source = ctx
            .resources
            .text(COLOR_SHADER)
            .context("color shader resource missing")?;
        self.program = Some(ctx.gfx.create_program(source)?);
        self.cube = Some(ctx.gfx.create_mesh(&mesh::colored_cube()));

        self.camera = Camera::new();
        self.camera.set_position(Point3::new(-3.0, 3.0, -3.0));
        self.camera.set_direction(vec3(3.0, -3.0, 3.0));
        self.camera.set_perspective(
            std::f32::consts::FRAC_PI_2,
            ctx.aspect(),
            0.01,
            1000.0,
        )?;

        let mut controller = FlyCameraController::new(&self.camera);
        controller.movement_sensitivity = 5.0;
        self.controller = Some(controller);

        ctx.gfx.set_cull_backfaces(true);
        ctx.gfx.set_depth_test(true);

        Ok(())
    }

    fn draw(&mut self, ctx: &mut SceneContext, delta_time: f32) {
        let (Some(program), Some(cube)) = (self.program, self.cube) else {
            return;
        };
        if let Some(controller) = &mut self.controller {
            controller.update(&mut self.camera, ctx.input, delta_time);
        }

        let (width, height) = ctx.frame_size;
        let state = self.compositor.begin_frame(ctx.gfx, width, height);
        let (_, vp) = self.compositor.render_region(
            ctx.gfx,
            state,
            Rect::full_surface(width, height),
            &self.camera,
            RgbaColor::BLACK,
            false,
        );
        let Some(vp) = vp else { return };

        let mut x = -GRID_HALF_EXTENT;
        while x <= GRID_HALF_EXTENT {
            let mut z = -GRID_HALF_EXTENT;
            while z <= GRID_HALF_EXTENT {
                let mvp = vp * Matrix4::from_translation(vec3(x as f32, 0.0, z as f32));
                ctx.gfx.draw(program, cube, mvp, RgbaColor::WHITE);
                z += GRID_STEP;
            }
            x += GRID_STEP;
        }
    }

    fn end(&mut self, ctx: &mut SceneContext) {
        if let Some(program) = self.program.take() {
            ctx.gfx.dispose_program(program);
        }
        if let Some(cube) = self.cube.take() {
            ctx.gfx.dispose_mesh(cube);
        }
        self.controller = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::testing::{Command, RecordingGfx};
    use crate::input::Input;
    use crate::loader::{Resource, ResourceMap};

    fn test_resources() -> ResourceMap {
        let mut resources = ResourceMap::empty();
        resources.insert(COLOR_SHADER, Resource::Text("// shader".into()));
        resources
    }

    fn context<'a>(
        gfx: &'a mut RecordingGfx,
        input: &'a Input,
        resources: &'a ResourceMap,
    ) -> SceneContext<'a> {
        SceneContext {
            gfx,
            input,
            resources,
            frame_size: (800, 600),
        }
    }

    #[test]
    fn test_draws_one_cube_per_grid_cell() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = GridScene::new();

        scene
            .start(&mut context(&mut gfx, &input, &resources))
            .unwrap();
        scene.draw(&mut context(&mut gfx, &input, &resources), 1.0 / 60.0);

        // 9 x 9 grid positions.
        assert_eq!(gfx.draw_count(), 81);
    }

    #[test]
    fn test_start_without_shader_fails() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = ResourceMap::empty();
        let mut scene = GridScene::new();

        assert!(
            scene
                .start(&mut context(&mut gfx, &input, &resources))
                .is_err()
        );
    }

    #[test]
    fn test_end_disposes_gpu_resources() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = GridScene::new();

        scene
            .start(&mut context(&mut gfx, &input, &resources))
            .unwrap();
        gfx.clear_commands();
        scene.end(&mut context(&mut gfx, &input, &resources));

        assert!(
            gfx.commands
                .iter()
                .any(|c| matches!(c, Command::DisposeProgram(_)))
        );
        assert!(
            gfx.commands
                .iter()
                .any(|c| matches!(c, Command::DisposeMesh(_)))
        );

        // Draw after end is a no-op rather than a use of disposed handles.
        gfx.clear_commands();
        scene.draw(&mut context(&mut gfx, &input, &resources), 1.0 / 60.0);
        assert_eq!(gfx.draw_count(), 0);
    }

    #[test]
    fn test_depth_test_and_culling_enabled_at_start() {
        let mut gfx = RecordingGfx::new();
        let input = Input::new();
        let resources = test_resources();
        let mut scene = GridScene::new();

        scene
            .start(&mut context(&mut gfx, &input, &resources))
            .unwrap();

        assert!(gfx.commands.contains(&Command::DepthTest(true)));
        assert!(gfx.commands.contains(&Command::CullBackfaces(true)));
    }
}
