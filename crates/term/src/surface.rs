//! Drawing surface backed by a terminal framebuffer.
//!
//! User space is measured in world units. Each terminal cell covers
//! `unit_w x unit_h` units of device space, so a default 8x16 cell keeps the
//! roughly 1:2 aspect ratio of terminal glyphs and a 32x32 tile becomes 4x2
//! cells.
//!
//! | Operation | Cells |
//! |-----------|-------|
//! | `clear_rect` | reset to the default cell |
//! | `fill_rect` | background tinted with the color (alpha blended) |
//! | `stroke_rect` | box-drawing outline |
//! | `draw_image` | background sampled from the source rect at each cell center |
//! | `draw_line` | Bresenham run of line glyphs |
//! | `fill_text` | glyphs over the existing background |

use tilescape_core::{Image, Surface, TransformStack};

use crate::fb::{Cell, CellRect, FrameBuffer};
use crate::types::{Color, Rect};

pub const DEFAULT_UNIT_W: f32 = 8.0;
pub const DEFAULT_UNIT_H: f32 = 16.0;

pub struct TermSurface {
    fb: FrameBuffer,
    unit_w: f32,
    unit_h: f32,
    transform: TransformStack,
}

impl TermSurface {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self::with_units(columns, rows, DEFAULT_UNIT_W, DEFAULT_UNIT_H)
    }

    pub fn with_units(columns: u16, rows: u16, unit_w: f32, unit_h: f32) -> Self {
        Self {
            fb: FrameBuffer::new(columns, rows),
            unit_w: if unit_w > 0.0 { unit_w } else { DEFAULT_UNIT_W },
            unit_h: if unit_h > 0.0 { unit_h } else { DEFAULT_UNIT_H },
            transform: TransformStack::new(),
        }
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.fb
    }

    pub fn units(&self) -> (f32, f32) {
        (self.unit_w, self.unit_h)
    }

    pub fn columns(&self) -> u16 {
        self.fb.width()
    }

    pub fn rows(&self) -> u16 {
        self.fb.height()
    }

    /// Resize to a new terminal size; returns the new size in units.
    pub fn resize(&mut self, columns: u16, rows: u16) -> (f32, f32) {
        self.fb.resize(columns, rows);
        self.size()
    }

    /// Cells covered by a user-space rect. A non-empty rect covers at least one cell.
    fn cells_of(&self, rect: Rect) -> CellRect {
        let r = self.transform.current().apply_rect(rect);
        if r.width <= 0.0 || r.height <= 0.0 {
            return self.fb.clip(0, 0, 0, 0);
        }
        let x0 = (r.left / self.unit_w).round() as i32;
        let y0 = (r.top / self.unit_h).round() as i32;
        let x1 = ((r.right() / self.unit_w).round() as i32).max(x0 + 1);
        let y1 = ((r.bottom() / self.unit_h).round() as i32).max(y0 + 1);
        self.fb.clip(x0, y0, x1, y1)
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        let (dx, dy) = self.transform.current().apply(x, y);
        ((dx / self.unit_w).floor() as i32, (dy / self.unit_h).floor() as i32)
    }
}

impl Surface for TermSurface {
    fn size(&self) -> (f32, f32) {
        (
            self.fb.width() as f32 * self.unit_w,
            self.fb.height() as f32 * self.unit_h,
        )
    }

    fn clear_rect(&mut self, rect: Rect) {
        let area = self.cells_of(rect);
        self.fb.fill_rect(area, ' ', Cell::default().style);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let area = self.cells_of(rect);
        self.fb.tint_rect(area, color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let area = self.cells_of(rect);
        self.fb.stroke_rect(area, color.into());
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) {
        let area = self.cells_of(dst);
        let (w, h) = ((area.x1 - area.x0) as f32, (area.y1 - area.y0) as f32);
        for y in area.y0..area.y1 {
            for x in area.x0..area.x1 {
                let u = ((x - area.x0) as f32 + 0.5) / w;
                let v = ((y - area.y0) as f32 + 0.5) / h;
                if let Some(color) = image.sample(src, u, v) {
                    self.fb.tint(x, y, color);
                }
            }
        }
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let from = self.cell_of(from.0, from.1);
        let to = self.cell_of(to.0, to.1);
        self.fb.draw_line(from, to, color.into());
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color) {
        let (cx, cy) = self.cell_of(x, y);
        if cy < 0 || cy >= self.fb.height() as i32 {
            return;
        }
        let skip = (-cx).max(0) as usize;
        let start = cx.max(0) as u16;
        let visible: String = text.chars().skip(skip).collect();
        self.fb.put_str(start, cy as u16, &visible, color.into());
    }

    fn measure_text(&self, text: &str) -> f32 {
        let sx = self.transform.current().sx;
        let sx = if sx != 0.0 { sx } else { 1.0 };
        text.chars().count() as f32 * self.unit_w / sx
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
