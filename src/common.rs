/// Tolerance used for degeneracy checks throughout the crate (zero-length
/// vectors, vanishing determinants, near-zero homogeneous coordinates).
pub const EPSILON: f32 = 1e-6;

/// An RGBA color with floating point channels in [0, 1].
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RgbaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RgbaColor {
    pub const BLACK: RgbaColor = RgbaColor::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: RgbaColor = RgbaColor::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl From<RgbaColor> for [f32; 4] {
    fn from(c: RgbaColor) -> [f32; 4] {
        [c.r, c.g, c.b, c.a]
    }
}

/// An axis-aligned rectangle in framebuffer pixel coordinates.
///
/// The origin is the top-left corner of the surface, matching wgpu viewport
/// and cursor conventions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The rectangle covering an entire surface of the given size.
    pub const fn full_surface(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The overlap of two rectangles, or an empty rectangle when they are
    /// disjoint. Used to keep viewport/scissor rectangles inside the surface.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        Rect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}
