use std::sync::Arc;

use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use wgpu_sandbox::input::{Input, Key, NamedKey};
use wgpu_sandbox::scenes::{GridScene, MultiViewScene, TreeScene};
use wgpu_sandbox::{SceneHost, WgpuGfx, winit_support};

/// Keyboard bindings for scene switching.
const SCENE_KEYS: [(char, &str); 3] = [('1', "Grid"), ('2', "MultiView"), ('3', "Tree")];

/// Application state for the winit event loop.
struct App<'a> {
    window: Option<Arc<Window>>,
    gfx: Option<WgpuGfx<'a>>,
    host: SceneHost,
    input: Input,
    last_frame: Option<Instant>,
}

impl App<'_> {
    /// Initialize the window and graphics device on first resume.
    fn initialize(&mut self, event_loop: &ActiveEventLoop) {
        let window_attrs = Window::default_attributes()
            .with_title("wgpu sandbox - 1: Grid  2: Multi-View  3: Tree");
        let window = Arc::new(event_loop.create_window(window_attrs).unwrap());

        let size = window.inner_size();
        let gfx = pollster::block_on(WgpuGfx::new(
            Arc::clone(&window),
            size.width,
            size.height,
        ))
        .expect("failed to initialize the graphics device");

        window.request_redraw();

        self.window = Some(window);
        self.gfx = Some(gfx);
    }

    /// One frame: apply pending scene switches, tick the host, present.
    fn redraw(&mut self) {
        let Some(gfx) = self.gfx.as_mut() else { return };

        let now = Instant::now();
        let delta_time = match self.last_frame {
            Some(last) => now.duration_since(last).as_secs_f32(),
            None => 1.0 / 60.0,
        };
        self.last_frame = Some(now);

        for (key, scene) in SCENE_KEYS {
            if self.input.is_key_just_pressed(Key::Character(key)) {
                self.host.start_scene(scene);
            }
        }

        let frame_size = gfx.size();
        self.host.frame(gfx, &self.input, frame_size, delta_time);
        self.input.end_frame();

        if let Err(err) = gfx.present() {
            log::error!("render error: {err:#}");
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.initialize(event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                if let Some(gfx) = self.gfx.as_mut() {
                    gfx.resize((size.width, size.height));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }

        winit_support::apply_window_event(&mut self.input, &event);

        if self.input.is_key_just_pressed(Key::Named(NamedKey::Escape)) {
            event_loop.exit();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        winit_support::apply_device_event(&mut self.input, &event);
    }
}

fn main() {
    env_logger::init();

    let mut host = SceneHost::new();
    host.add_scene("Grid", Box::new(GridScene::new()));
    host.add_scene("MultiView", Box::new(MultiViewScene::new()));
    host.add_scene("Tree", Box::new(TreeScene::new()));
    host.start_scene("Grid");

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        window: None,
        gfx: None,
        host,
        input: Input::new(),
        last_frame: None,
    };
    event_loop.run_app(&mut app).unwrap();
}
