//! A sea, three spinning islands, and nine fractal trees, all generated by
//! recursive transform composition from a single unit cube.

use std::collections::HashMap;

use anyhow::Context as _;
use cgmath::{Matrix4, Point3, Rad, vec3};

use crate::camera::Camera;
use crate::common::{Rect, RgbaColor};
use crate::compositor::ViewportCompositor;
use crate::controller::FlyCameraController;
use crate::graphics::{GraphicsLayer, MeshId, ProgramId};
use crate::loader::ResourceRequest;
use crate::mesh;
use crate::scene::{Scene, SceneContext};
use crate::scene_graph;

use super::{COLOR_SHADER, color_shader_request};

const SEA_TINT: RgbaColor = RgbaColor::new(0.1, 0.1, 0.3, 1.0);
const GROUND_TINT: RgbaColor = RgbaColor::new(0.4, 0.3, 0.1, 1.0);

/// One tree color per island slot, rotated down the branches from there.
const TREE_COLORS: [RgbaColor; 3] = [
    RgbaColor::new(0.5, 0.8, 0.1, 1.0),
    RgbaColor::new(0.1, 0.5, 0.8, 1.0),
    RgbaColor::new(0.8, 0.5, 0.1, 1.0),
];

pub struct TreeScene {
    program: Option<ProgramId>,
    cube: Option<MeshId>,
    camera: Camera,
    controller: Option<FlyCameraController>,
    compositor: ViewportCompositor,
    time: f32,
}

impl TreeScene {
    pub fn new() -> Self {
        Self {
            program: None,
            cube: None,
            camera: Camera::new(),
            controller: None,
            compositor: ViewportCompositor::new(),
            time: 0.0,
        }
    }

    /// Draws the sea, then three islands spinning at independent,
    /// slot-dependent rates around their own origins.
    fn draw_world(&self, gfx: &mut dyn GraphicsLayer, parent: Matrix4<f32>) {
        let (Some(program), Some(cube)) = (self.program, self.cube) else {
            return;
        };

        let sea = parent * Matrix4::from_nonuniform_scale(100.0, 0.05, 100.0);
        gfx.draw(program, cube, sea, SEA_TINT);

        for slot in -1i32..=1 {
            let island = parent
                * Matrix4::from_translation(vec3(0.0, 0.0, slot as f32 * 40.0))
                * Matrix4::from_angle_y(Rad(slot as f32 * 0.5 * self.time));
            self.draw_island(gfx, island);
        }
    }

    /// Draws an island's ground slab and its three trees. Tree `slot` picks
    /// the color and recursion depth, so the same generator produces small,
    /// medium and large trees side by side.
    fn draw_island(&self, gfx: &mut dyn GraphicsLayer, parent: Matrix4<f32>) {
        let (Some(program), Some(cube)) = (self.program, self.cube) else {
            return;
        };

        let ground = parent * Matrix4::from_nonuniform_scale(24.0, 0.1, 6.0);
        gfx.draw(program, cube, ground, GROUND_TINT);

        for slot in -1i32..=1 {
            let tree = parent
                * Matrix4::from_translation(vec3(slot as f32 * 20.0, 0.0, 0.0))
                * Matrix4::from_angle_y(Rad(slot as f32 * self.time));
            let color = TREE_COLORS[(slot + 1) as usize];
            let layer = (slot + 3) as u32;
            scene_graph::draw_tree(tree, color, layer, &mut |matrix, tint| {
                gfx.draw(program, cube, matrix, tint);
            });
        }
    }
}

impl Default for TreeScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for TreeScene {
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

        self.camera = Camera::new();
        self.camera.set_position(Point3::new(-20.0, 10.0, -20.0));
        self.camera.set_direction(vec3(1.0, -0.5, 1.0));
        self.camera.set_perspective(
            std::f32::consts::FRAC_PI_2,
            ctx.aspect(),
            0.01,
            1000.0,
        )?;

        let mut controller = FlyCameraController::new(&self.camera);
        controller.movement_sensitivity = 50.0;
        self.controller = Some(controller);

        ctx.gfx.set_cull_backfaces(true);
        ctx.gfx.set_depth_test(true);

        self.time = 0.0;

        Ok(())
    }

    fn draw(&mut self, ctx: &mut SceneContext, delta_time: f32) {
        self.time += delta_time;
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
        if let Some(vp) = vp {
            self.draw_world(ctx.gfx, vp);
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
