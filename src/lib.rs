//! A teaching sandbox for real-time 3D rendering fundamentals.
//!
//! Each demonstration is a standalone [`scene::Scene`] wired into a shared
//! [`scene::SceneHost`]. The geometric core (camera, viewport compositing,
//! procedural transform stacks, picking) is GPU-free and unit-tested against
//! a recorded command stream; [`renderer::WgpuGfx`] supplies the wgpu backend
//! behind the [`graphics::GraphicsLayer`] contract.

pub mod camera;
pub mod common;
pub mod compositor;
pub mod controller;
pub mod geom_query;
pub mod graphics;
pub mod input;
pub mod loader;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod scene_graph;
pub mod scenes;

// Winit support - only available when winit is a dependency
#[cfg(feature = "winit-support")]
pub mod winit_support;

pub use camera::{Camera, CameraError, Projection};
pub use common::{Rect, RgbaColor};
pub use compositor::{RasterState, ViewportCompositor};
pub use geom_query::PickError;
pub use graphics::GraphicsLayer;
pub use renderer::WgpuGfx;
pub use scene::{Scene, SceneContext, SceneHost};
