//! Framebuffer and style types for terminal rendering.

use crate::types::Color;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Composite `over` on top of `self` using its alpha.
    pub fn blend(self, over: Color) -> Rgb {
        let a = over.a as u16;
        let mix = |under: u8, top: u8| ((top as u16 * a + under as u16 * (255 - a)) / 255) as u8;
        Rgb::new(mix(self.r, over.r), mix(self.g, over.g), mix(self.b, over.b))
    }
}

impl From<Color> for Rgb {
    fn from(c: Color) -> Self {
        Rgb::new(c.r, c.g, c.b)
    }
}

/// Glyph and background colors of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Rgb,
    pub bg: Rgb,
}

impl CellStyle {
    pub const fn new(fg: Rgb, bg: Rgb) -> Self {
        Self { fg, bg }
    }
}

impl Default for CellStyle {
    fn default() -> Self {
        Self::new(Rgb::new(220, 220, 220), Rgb::new(0, 0, 0))
    }
}

/// A single terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: CellStyle::default(),
        }
    }
}

/// Inclusive-exclusive cell range `x0..x1, y0..y1`, already clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl CellRect {
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// 2D framebuffer of styled character cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![Cell::default(); len],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Resize the framebuffer.
    ///
    /// This preserves the underlying allocation when possible.
    pub fn resize(&mut self, width: u16, height: u16) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        let len = (width as usize) * (height as usize);
        self.cells.resize(len, Cell::default());
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline(always)]
    fn idx(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        self.idx(x, y).map(|i| self.cells[i])
    }

    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.idx(x, y).map(|i| &mut self.cells[i])
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = cell;
        }
    }

    pub fn clear(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Clip a signed cell rectangle to the buffer.
    pub fn clip(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> CellRect {
        let cx = |v: i32| v.clamp(0, self.width as i32) as u16;
        let cy = |v: i32| v.clamp(0, self.height as i32) as u16;
        CellRect {
            x0: cx(x0),
            y0: cy(y0),
            x1: cx(x1),
            y1: cy(y1),
        }
    }

    pub fn put_char(&mut self, x: u16, y: u16, ch: char, style: CellStyle) {
        self.set(x, y, Cell { ch, style });
    }

    /// Write `s` starting at `(x, y)`, keeping each cell's background.
    pub fn put_str(&mut self, x: u16, y: u16, s: &str, fg: Rgb) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.put_glyph(cx, y, ch, fg);
            cx += 1;
        }
    }

    /// Set the glyph and foreground of a cell, keeping its background.
    pub fn put_glyph(&mut self, x: u16, y: u16, ch: char, fg: Rgb) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.ch = ch;
            cell.style.fg = fg;
        }
    }

    pub fn fill_rect(&mut self, area: CellRect, ch: char, style: CellStyle) {
        for y in area.y0..area.y1 {
            for x in area.x0..area.x1 {
                self.put_char(x, y, ch, style);
            }
        }
    }

    /// Composite `color` over the background of every cell in `area`.
    ///
    /// Opaque colors also blank the glyph.
    pub fn tint_rect(&mut self, area: CellRect, color: Color) {
        if color.a == 0 {
            return;
        }
        for y in area.y0..area.y1 {
            for x in area.x0..area.x1 {
                self.tint(x, y, color);
            }
        }
    }

    pub fn tint(&mut self, x: u16, y: u16, color: Color) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.style.bg = cell.style.bg.blend(color);
            if color.a == 255 {
                cell.ch = ' ';
            }
        }
    }

    /// Box outline around `area`.
    pub fn stroke_rect(&mut self, area: CellRect, fg: Rgb) {
        if area.is_empty() {
            return;
        }
        let (right, bottom) = (area.x1 - 1, area.y1 - 1);
        if area.x1 - area.x0 == 1 || area.y1 - area.y0 == 1 {
            for y in area.y0..area.y1 {
                for x in area.x0..area.x1 {
                    self.put_glyph(x, y, '□', fg);
                }
            }
            return;
        }
        for x in area.x0 + 1..right {
            self.put_glyph(x, area.y0, '─', fg);
            self.put_glyph(x, bottom, '─', fg);
        }
        for y in area.y0 + 1..bottom {
            self.put_glyph(area.x0, y, '│', fg);
            self.put_glyph(right, y, '│', fg);
        }
        self.put_glyph(area.x0, area.y0, '┌', fg);
        self.put_glyph(right, area.y0, '┐', fg);
        self.put_glyph(area.x0, bottom, '└', fg);
        self.put_glyph(right, bottom, '┘', fg);
    }

    /// Bresenham line between two cells; off-buffer cells are skipped.
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), fg: Rgb) {
        let ch = if from.1 == to.1 {
            '─'
        } else if from.0 == to.0 {
            '│'
        } else {
            '·'
        };
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if x >= 0 && y >= 0 && x <= u16::MAX as i32 && y <= u16::MAX as i32 {
                self.put_glyph(x as u16, y as u16, ch, fg);
            }
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}
