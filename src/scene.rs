//! Scene lifecycle and the host that switches between scenes.
//!
//! Every demonstration implements [`Scene`]: declare resources in `load`,
//! build GPU state in `start`, render in `draw`, release everything in `end`.
//! The [`SceneHost`] owns the registered scenes and drives exactly one of
//! them per frame, polling resource loads between `end` and `start` so a
//! scene never starts with unresolved resources.

use std::collections::HashMap;

use crate::graphics::GraphicsLayer;
use crate::input::Input;
use crate::loader::{self, LoadHandle, ResourceMap, ResourceRequest};

/// Everything a scene may touch during a lifecycle call.
pub struct SceneContext<'a> {
    /// The graphics resource layer (programs, meshes, raster state, draws).
    pub gfx: &'a mut dyn GraphicsLayer,
    /// Aggregate input state for the frame.
    pub input: &'a Input,
    /// Resources resolved from this scene's `load` declaration.
    pub resources: &'a ResourceMap,
    /// Current framebuffer size in pixels.
    pub frame_size: (u32, u32),
}

impl SceneContext<'_> {
    /// Framebuffer aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.frame_size.0 as f32 / self.frame_size.1 as f32
    }
}

/// A standalone demonstration wired into the scene host.
pub trait Scene {
    /// Declares the named resources to resolve before `start` runs.
    fn load(&self) -> HashMap<String, ResourceRequest> {
        HashMap::new()
    }

    /// Builds GPU resources and initial camera state. Invoked once, after
    /// loading completes. On error the host never calls `draw`; `end` still
    /// runs so partially created resources are released.
    fn start(&mut self, ctx: &mut SceneContext) -> anyhow::Result<()>;

    /// Called once per frame with the elapsed time in seconds.
    fn draw(&mut self, ctx: &mut SceneContext, delta_time: f32);

    /// Releases every GPU resource created in `start`. Runs before the next
    /// scene's `start`, and must tolerate a `start` that failed partway.
    fn end(&mut self, ctx: &mut SceneContext);
}

enum HostState {
    /// No scene active or loading.
    Idle,
    /// Waiting for the named scene's resources.
    Loading { index: usize, handle: LoadHandle },
    /// The named scene is drawing every frame.
    Running { index: usize },
}

/// Registry and switcher for named scenes.
///
/// Switching is deferred to the next [`SceneHost::frame`] call so that the
/// running scene's `end` and the next scene's `load`/`start` all happen
/// frame-synchronously, in order, with the same context discipline.
pub struct SceneHost {
    scenes: Vec<(String, Box<dyn Scene>)>,
    resources: ResourceMap,
    state: HostState,
    pending: Option<usize>,
}

impl SceneHost {
    pub fn new() -> Self {
        Self {
            scenes: Vec::new(),
            resources: ResourceMap::empty(),
            state: HostState::Idle,
            pending: None,
        }
    }

    /// Registers a scene under a name. Names are expected to be unique; a
    /// duplicate registration shadows the earlier scene for switching.
    pub fn add_scene(&mut self, name: impl Into<String>, scene: Box<dyn Scene>) {
        self.scenes.push((name.into(), scene));
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.iter().map(|(name, _)| name.as_str())
    }

    /// The name of the scene currently drawing, if any.
    pub fn active_scene(&self) -> Option<&str> {
        match self.state {
            HostState::Running { index } => Some(self.scenes[index].0.as_str()),
            _ => None,
        }
    }

    /// Requests a switch to the named scene. Takes effect at the next
    /// `frame` call; an unknown name is logged and ignored.
    pub fn start_scene(&mut self, name: &str) {
        match self.scenes.iter().rposition(|(n, _)| n == name) {
            Some(index) => self.pending = Some(index),
            None => log::warn!("unknown scene '{name}'"),
        }
    }

    /// Drives one frame: applies any pending switch (ending the running
    /// scene first), polls an in-flight load, and draws the active scene.
    pub fn frame(
        &mut self,
        gfx: &mut dyn GraphicsLayer,
        input: &Input,
        frame_size: (u32, u32),
        delta_time: f32,
    ) {
        if let Some(next) = self.pending.take() {
            // The running scene must release its GPU resources before the
            // next scene's start runs; an in-flight load is simply dropped
            // (the loader thread notices the closed channel).
            if let HostState::Running { index } = self.state {
                let mut ctx = SceneContext {
                    gfx: &mut *gfx,
                    input,
                    resources: &self.resources,
                    frame_size,
                };
                self.scenes[index].1.end(&mut ctx);
            }
            self.resources = ResourceMap::empty();
            let handle = loader::load_async(self.scenes[next].1.load());
            self.state = HostState::Loading {
                index: next,
                handle,
            };
        }

        match std::mem::replace(&mut self.state, HostState::Idle) {
            HostState::Idle => {}
            HostState::Loading { index, handle } => match handle.try_recv() {
                None => {
                    // Still loading; put the handle back.
                    self.state = HostState::Loading { index, handle };
                }
                Some(Ok(resources)) => {
                    self.resources = resources;
                    let mut ctx = SceneContext {
                        gfx: &mut *gfx,
                        input,
                        resources: &self.resources,
                        frame_size,
                    };
                    let (name, scene) = &mut self.scenes[index];
                    match scene.start(&mut ctx) {
                        Ok(()) => {
                            log::info!("scene '{name}' started");
                            self.state = HostState::Running { index };
                        }
                        Err(err) => {
                            log::error!("scene '{name}' failed to start: {err:#}");
                            // Release whatever start managed to create; a
                            // half-initialized scene is never drawn.
                            scene.end(&mut ctx);
                        }
                    }
                }
                Some(Err(err)) => {
                    log::error!("resource load failed: {err}");
                }
            },
            HostState::Running { index } => {
                self.state = HostState::Running { index };
                let mut ctx = SceneContext {
                    gfx: &mut *gfx,
                    input,
                    resources: &self.resources,
                    frame_size,
                };
                self.scenes[index].1.draw(&mut ctx, delta_time);
            }
        }
    }
}

impl Default for SceneHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::testing::RecordingGfx;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct ProbeScene {
        name: &'static str,
        journal: Journal,
        fail_start: bool,
    }

    impl Scene for ProbeScene {
        fn start(&mut self, _ctx: &mut SceneContext) -> anyhow::Result<()> {
            self.journal.borrow_mut().push(format!("start {}", self.name));
            if self.fail_start {
                anyhow::bail!("intentional start failure");
            }
            Ok(())
        }

        fn draw(&mut self, _ctx: &mut SceneContext, _delta_time: f32) {
            self.journal.borrow_mut().push(format!("draw {}", self.name));
        }

        fn end(&mut self, _ctx: &mut SceneContext) {
            self.journal.borrow_mut().push(format!("end {}", self.name));
        }
    }

    fn probe(name: &'static str, journal: &Journal) -> Box<ProbeScene> {
        Box::new(ProbeScene {
            name,
            journal: Rc::clone(journal),
            fail_start: false,
        })
    }

    /// Pumps frames until the host leaves the loading state (the loader
    /// thread needs a moment even for an empty request set).
    fn pump(host: &mut SceneHost, gfx: &mut RecordingGfx, input: &Input, frames: usize) {
        for _ in 0..frames {
            host.frame(gfx, input, (800, 600), 1.0 / 60.0);
            if host.active_scene().is_some() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_scene_runs_after_load_completes() {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let mut host = SceneHost::new();
        host.add_scene("a", probe("a", &journal));

        let mut gfx = RecordingGfx::new();
        let input = Input::new();

        host.start_scene("a");
        pump(&mut host, &mut gfx, &input, 200);
        assert_eq!(host.active_scene(), Some("a"));

        host.frame(&mut gfx, &input, (800, 600), 1.0 / 60.0);
        let journal = journal.borrow();
        assert_eq!(journal[0], "start a");
        assert!(journal.iter().any(|entry| entry == "draw a"));
    }

    #[test]
    fn test_switch_ends_running_scene_before_next_start() {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let mut host = SceneHost::new();
        host.add_scene("a", probe("a", &journal));
        host.add_scene("b", probe("b", &journal));

        let mut gfx = RecordingGfx::new();
        let input = Input::new();

        host.start_scene("a");
        pump(&mut host, &mut gfx, &input, 200);

        host.start_scene("b");
        // First frame ends "a" and kicks the load; later frames start "b".
        host.frame(&mut gfx, &input, (800, 600), 1.0 / 60.0);
        pump(&mut host, &mut gfx, &input, 200);
        assert_eq!(host.active_scene(), Some("b"));

        let journal = journal.borrow();
        let end_a = journal.iter().position(|e| e == "end a").unwrap();
        let start_b = journal.iter().position(|e| e == "start b").unwrap();
        assert!(end_a < start_b, "end must precede the next start");
    }

    #[test]
    fn test_failed_start_never_draws() {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let mut host = SceneHost::new();
        host.add_scene(
            "broken",
            Box::new(ProbeScene {
                name: "broken",
                journal: Rc::clone(&journal),
                fail_start: true,
            }),
        );

        let mut gfx = RecordingGfx::new();
        let input = Input::new();

        host.start_scene("broken");
        for _ in 0..200 {
            host.frame(&mut gfx, &input, (800, 600), 1.0 / 60.0);
            if journal.borrow().iter().any(|e| e.starts_with("start")) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        // A few extra frames to prove nothing draws afterwards.
        for _ in 0..3 {
            host.frame(&mut gfx, &input, (800, 600), 1.0 / 60.0);
        }

        let journal = journal.borrow();
        assert!(journal.iter().any(|e| e == "start broken"));
        assert!(journal.iter().any(|e| e == "end broken"), "cleanup must run");
        assert!(!journal.iter().any(|e| e == "draw broken"));
        assert_eq!(host.active_scene(), None);
    }

    #[test]
    fn test_unknown_scene_is_ignored() {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let mut host = SceneHost::new();
        host.add_scene("a", probe("a", &journal));

        let mut gfx = RecordingGfx::new();
        let input = Input::new();

        host.start_scene("nope");
        host.frame(&mut gfx, &input, (800, 600), 1.0 / 60.0);

        assert!(journal.borrow().is_empty());
        assert_eq!(host.active_scene(), None);
    }
}
