//! CPU-side mesh data and constructors for the simple shapes the scenes use.

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];
const MAGENTA: [u8; 4] = [255, 0, 255, 255];
const CYAN: [u8; 4] = [0, 255, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// A single vertex: position plus a normalized-u8 RGBA color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl Vertex {
    pub const fn new(position: [f32; 3], color: [u8; 4]) -> Self {
        Self { position, color }
    }
}

/// Vertex and index data ready for upload through the graphics layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A unit quad in the XY plane, centered at the origin with half-extent 0.5,
/// one color per corner. The same quad serves as the picking target: its
/// local bounds are exactly the |x|, |y| <= 0.5 test.
pub fn colored_plane() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex::new([-0.5, -0.5, 0.0], RED),
            Vertex::new([0.5, -0.5, 0.0], GREEN),
            Vertex::new([0.5, 0.5, 0.0], BLUE),
            Vertex::new([-0.5, 0.5, 0.0], MAGENTA),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

/// A cube spanning [-1, 1] on every axis, 24 vertices so each face carries
/// its own color, faces wound counter-clockwise when viewed from outside.
pub fn colored_cube() -> MeshData {
    cube_with_face_colors([RED, GREEN, BLUE, YELLOW, MAGENTA, CYAN])
}

/// The same cube with every face white, for scenes that color via the tint
/// uniform instead of vertex colors.
pub fn white_cube() -> MeshData {
    cube_with_face_colors([WHITE; 6])
}

/// Face order: top, bottom, right, left, front (+Z), back (-Z).
fn cube_with_face_colors(colors: [[u8; 4]; 6]) -> MeshData {
    #[rustfmt::skip]
    let face_positions: [[[f32; 3]; 4]; 6] = [
        // Top
        [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
        // Bottom
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
        // Right
        [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
        // Left
        [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
        // Front
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
        // Back
        [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, positions) in face_positions.iter().enumerate() {
        let base = (face * 4) as u32;
        for position in positions {
            vertices.push(Vertex::new(*position, colors[face]));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData { vertices, indices }
}
