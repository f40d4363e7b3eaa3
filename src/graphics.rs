use cgmath::Matrix4;
use thiserror::Error;

use crate::common::{Rect, RgbaColor};
use crate::mesh::MeshData;

/// Handle to a compiled shader program owned by the graphics layer.
pub type ProgramId = u32;

/// Handle to an uploaded mesh (vertex + index buffers) owned by the graphics
/// layer.
pub type MeshId = u32;

/// Errors surfaced by the graphics resource layer.
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("shader program creation failed: {0}")]
    ProgramCreation(String),

    #[error("unknown program id {0}")]
    UnknownProgram(ProgramId),

    #[error("unknown mesh id {0}")]
    UnknownMesh(MeshId),
}

/// The narrow contract between the core and the GPU.
///
/// The core issues only resource creation/disposal, raster-state changes,
/// clears, and draws with per-draw matrix/tint uniforms through this trait.
/// Shader compilation semantics, buffer management, and pass organization are
/// the backend's business ([`crate::renderer::WgpuGfx`] for a real GPU, a
/// command recorder in tests).
///
/// Raster-state calls are sticky until changed, mirroring the GPU context
/// they abstract; the [`crate::compositor`] module threads an explicit
/// [`crate::compositor::RasterState`] value alongside so the current state is
/// always inspectable without querying the backend.
pub trait GraphicsLayer {
    /// Compiles a shader program from WGSL source.
    fn create_program(&mut self, source: &str) -> Result<ProgramId, GraphicsError>;

    /// Releases a program. Disposing an unknown id is a no-op.
    fn dispose_program(&mut self, program: ProgramId);

    /// Uploads vertex and index data for a mesh.
    fn create_mesh(&mut self, data: &MeshData) -> MeshId;

    /// Releases a mesh. Disposing an unknown id is a no-op.
    fn dispose_mesh(&mut self, mesh: MeshId);

    /// Sets the rectangle the normalized device coordinates map onto.
    fn set_viewport(&mut self, rect: Rect);

    /// Sets the scissor rectangle. Only takes effect while scissoring is
    /// enabled.
    fn set_scissor(&mut self, rect: Rect);

    /// Enables or disables the scissor test. While enabled, no raster
    /// operation (clears included) touches pixels outside the scissor
    /// rectangle.
    fn set_scissor_enabled(&mut self, enabled: bool);

    /// Enables or disables depth testing (and with it, depth writes).
    fn set_depth_test(&mut self, enabled: bool);

    /// Enables or disables back-face culling.
    fn set_cull_backfaces(&mut self, enabled: bool);

    /// Clears the color and/or depth buffers, honoring the scissor test.
    fn clear(&mut self, color: Option<RgbaColor>, depth: bool);

    /// Draws a mesh with the given program, full MVP matrix and tint color.
    fn draw(&mut self, program: ProgramId, mesh: MeshId, mvp: Matrix4<f32>, tint: RgbaColor);
}
