//! Axis-aligned rectangles and colors.

/// Axis-aligned rectangle in world units.
///
/// `left`/`top` is the origin; `right`/`bottom` are derived.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Move the origin, keeping the size.
    pub fn set_origin(&mut self, left: f32, top: f32) {
        self.left = left;
        self.top = top;
    }

    /// True if `self` lies completely inside `outer` (edges may touch).
    pub fn within(&self, outer: &Rect) -> bool {
        outer.left <= self.left
            && outer.right() >= self.right()
            && outer.top <= self.top
            && outer.bottom() >= self.bottom()
    }

    /// True if the two rectangles share any interior area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    pub fn contains_point(&self, x: f32, z: f32) -> bool {
        x >= self.left && x < self.right() && z >= self.top && z < self.bottom()
    }

    pub fn translated(&self, dx: f32, dz: f32) -> Rect {
        Rect::new(self.left + dx, self.top + dz, self.width, self.height)
    }
}

/// 32-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}
