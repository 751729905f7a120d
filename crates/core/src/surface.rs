//! Drawing surface abstraction.
//!
//! The scene draws through [`Surface`]: a 2D raster context with rect fills,
//! sub-rect image blits, lines, text and an affine transform stack
//! (translate/scale/save/restore). Backends map the transformed coordinates to
//! their own raster; [`RecordingSurface`] keeps a log of device-space
//! operations for headless runs and tests.

use tilescape_types::{Color, Rect};

use crate::assets::Image;

/// 2D drawing target.
///
/// All coordinates are in user space and pass through the current transform.
pub trait Surface {
    /// Device size in user units (before any transform).
    fn size(&self) -> (f32, f32);

    fn clear_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color);

    /// Blit the `src` sub-rect of `image` into `dst`.
    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect);

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color);
    fn measure_text(&self, text: &str) -> f32;

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn scale(&mut self, sx: f32, sy: f32);
}

/// Translate + scale transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub tx: f32,
    pub ty: f32,
    pub sx: f32,
    pub sy: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            tx: 0.0,
            ty: 0.0,
            sx: 1.0,
            sy: 1.0,
        }
    }
}

impl Transform {
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }

    pub fn apply_rect(&self, r: Rect) -> Rect {
        let (left, top) = self.apply(r.left, r.top);
        Rect::new(left, top, r.width * self.sx, r.height * self.sy)
    }
}

/// Save/restore stack of transforms.
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Transform,
    saved: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Transform {
        self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    /// Restoring an empty stack resets to identity.
    pub fn restore(&mut self) {
        self.current = self.saved.pop().unwrap_or_default();
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.current.tx += dx * self.current.sx;
        self.current.ty += dy * self.current.sy;
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.current.sx *= sx;
        self.current.sy *= sy;
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Operation captured by [`RecordingSurface`], in device space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Rect),
    Fill(Rect, Color),
    Stroke(Rect, Color),
    Image { key: String, src: Rect, dst: Rect },
    Line { from: (f32, f32), to: (f32, f32), color: Color },
    Text { text: String, x: f32, y: f32 },
}

/// Surface that records every operation instead of rasterizing it.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    transform: TransformStack,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            transform: TransformStack::new(),
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn transform_depth(&self) -> usize {
        self.transform.depth()
    }

    /// Number of image blits of `key`.
    pub fn image_count(&self, key: &str) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { key: k, .. } if k == key))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear_rect(&mut self, rect: Rect) {
        let r = self.transform.current().apply_rect(rect);
        self.ops.push(DrawOp::Clear(r));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let r = self.transform.current().apply_rect(rect);
        self.ops.push(DrawOp::Fill(r, color));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let r = self.transform.current().apply_rect(rect);
        self.ops.push(DrawOp::Stroke(r, color));
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) {
        let dst = self.transform.current().apply_rect(dst);
        self.ops.push(DrawOp::Image {
            key: image.key().to_string(),
            src,
            dst,
        });
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let t = self.transform.current();
        self.ops.push(DrawOp::Line {
            from: t.apply(from.0, from.1),
            to: t.apply(to.0, to.1),
            color,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, _color: Color) {
        let (x, y) = self.transform.current().apply(x, y);
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn measure_text(&self, text: &str) -> f32 {
        text.chars().count() as f32 * 8.0
    }

    fn save(&mut self) {
        self.transform.save();
    }

    fn restore(&mut self) {
        self.transform.restore();
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform.translate(dx, dy);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.scale(sx, sy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_is_scaled_by_current_scale() {
        let mut t = TransformStack::new();
        t.scale(2.0, 2.0);
        t.translate(10.0, 5.0);
        assert_eq!(t.current().apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn restore_pops_saved_transform() {
        let mut s = RecordingSurface::new(100.0, 100.0);
        s.save();
        s.translate(10.0, 10.0);
        s.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::RED);
        s.restore();
        s.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::RED);

        assert_eq!(
            s.ops(),
            &[
                DrawOp::Fill(Rect::new(10.0, 10.0, 5.0, 5.0), Color::RED),
                DrawOp::Fill(Rect::new(0.0, 0.0, 5.0, 5.0), Color::RED),
            ]
        );
        assert_eq!(s.transform_depth(), 0);
    }
}
