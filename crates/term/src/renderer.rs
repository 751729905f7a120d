//! TerminalRenderer: flushes a framebuffer to a real terminal.
//!
//! The first frame and every frame after a size change are full redraws; in
//! between only changed runs of cells are written. Tile worlds mostly change
//! backgrounds, so foreground and background colors are only re-sent when
//! they actually change.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{
    cursor, event,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal, QueueableCommand,
};

use crate::fb::{Cell, FrameBuffer, Rgb};

/// Longest gap of unchanged cells rewritten to join two changed runs.
const BRIDGE_GAP: u16 = 3;

pub struct TerminalRenderer<W: Write = io::Stdout> {
    out: W,
    last: Option<FrameBuffer>,
    buf: Vec<u8>,
    mouse: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            last: None,
            buf: Vec::with_capacity(64 * 1024),
            mouse: true,
        }
    }

    /// Capture mouse events while the terminal is entered.
    pub fn with_mouse_capture(mut self, mouse: bool) -> Self {
        self.mouse = mouse;
        self
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        if self.mouse {
            self.buf.queue(event::EnableMouseCapture)?;
        }
        self.flush_buf()?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        if self.mouse {
            self.buf.queue(event::DisableMouseCapture)?;
        }
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Force the next draw to be a full redraw.
    ///
    /// Useful on terminal resize events.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Draw a framebuffer, swapping it into internal state.
    ///
    /// Callers should keep one `FrameBuffer` and pass it in every frame.
    /// The renderer diffs against the previous frame and then swaps buffers,
    /// so after the call `fb` holds the previous frame's cells.
    pub fn draw_swap(&mut self, fb: &mut FrameBuffer) -> Result<()> {
        self.buf.clear();
        let mut prev = match self.last.take() {
            Some(prev) if prev.width() == fb.width() && prev.height() == fb.height() => {
                encode_diff_into(&prev, fb, &mut self.buf)?;
                prev
            }
            Some(mut prev) => {
                encode_full_into(fb, &mut self.buf)?;
                prev.resize(fb.width(), fb.height());
                prev
            }
            None => {
                encode_full_into(fb, &mut self.buf)?;
                FrameBuffer::new(fb.width(), fb.height())
            }
        };
        self.flush_buf()?;

        std::mem::swap(&mut prev, fb);
        self.last = Some(prev);
        Ok(())
    }

    /// Draw a framebuffer, copying it into internal state.
    pub fn draw(&mut self, fb: &FrameBuffer) -> Result<()> {
        let mut frame = fb.clone();
        self.draw_swap(&mut frame)
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Encode a full-frame redraw into `out`.
///
/// Every row is addressed explicitly, so the output does not depend on the
/// terminal's line wrapping.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mut pen = Pen::default();
    for y in 0..fb.height() {
        pen.run(out, fb, Run { x: 0, y, len: fb.width() })?;
    }
    pen.finish(out)
}

/// Encode the changed runs between two frames of the same size into `out`.
pub fn encode_diff_into(prev: &FrameBuffer, next: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    let mut pen = Pen::default();
    for run in changed_runs(prev, next) {
        pen.run(out, next, run)?;
    }
    pen.finish(out)
}

/// Horizontal span of cells on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    x: u16,
    y: u16,
    len: u16,
}

/// Colors last sent to the terminal.
#[derive(Debug, Default)]
struct Pen {
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl Pen {
    fn run(&mut self, out: &mut Vec<u8>, fb: &FrameBuffer, run: Run) -> Result<()> {
        if run.len == 0 {
            return Ok(());
        }
        out.queue(cursor::MoveTo(run.x, run.y))?;
        for x in run.x..run.x + run.len {
            let cell = fb.get(x, run.y).unwrap_or_default();
            self.cell(out, cell)?;
        }
        Ok(())
    }

    fn cell(&mut self, out: &mut Vec<u8>, cell: Cell) -> Result<()> {
        if self.fg != Some(cell.style.fg) {
            out.queue(SetForegroundColor(true_color(cell.style.fg)))?;
            self.fg = Some(cell.style.fg);
        }
        if self.bg != Some(cell.style.bg) {
            out.queue(SetBackgroundColor(true_color(cell.style.bg)))?;
            self.bg = Some(cell.style.bg);
        }
        out.queue(Print(cell.ch))?;
        Ok(())
    }

    /// Leave the terminal in its default colors; nothing is written for an empty frame.
    fn finish(self, out: &mut Vec<u8>) -> Result<()> {
        if self.fg.is_some() || self.bg.is_some() {
            out.queue(ResetColor)?;
        }
        Ok(())
    }
}

fn true_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// Changed runs between two frames, row by row.
///
/// Frames of different size are entirely dirty. Runs separated by at most
/// `BRIDGE_GAP` unchanged cells are merged.
fn changed_runs(prev: &FrameBuffer, next: &FrameBuffer) -> Vec<Run> {
    let (w, h) = (next.width(), next.height());
    if prev.width() != w || prev.height() != h {
        return (0..h).map(|y| Run { x: 0, y, len: w }).collect();
    }

    let mut runs = Vec::new();
    let row_len = w as usize;
    if row_len == 0 {
        return runs;
    }
    let rows = prev.cells().chunks(row_len).zip(next.cells().chunks(row_len));
    for (y, (before, after)) in rows.enumerate() {
        let y = y as u16;
        let mut open: Option<Run> = None;
        for (x, (a, b)) in before.iter().zip(after).enumerate() {
            if a == b {
                continue;
            }
            let x = x as u16;
            match open.as_mut() {
                Some(run) if x - (run.x + run.len) <= BRIDGE_GAP => run.len = x - run.x + 1,
                _ => {
                    runs.extend(open.take());
                    open = Some(Run { x, y, len: 1 });
                }
            }
        }
        runs.extend(open);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fb::CellStyle;

    fn mark(fb: &mut FrameBuffer, x: u16, y: u16) {
        fb.set(
            x,
            y,
            Cell {
                ch: '#',
                style: CellStyle::default(),
            },
        );
    }

    #[test]
    fn runs_merge_across_small_gaps() {
        let a = FrameBuffer::new(12, 2);
        let mut b = FrameBuffer::new(12, 2);
        for x in [1, 2, 5, 11] {
            mark(&mut b, x, 0);
        }
        mark(&mut b, 0, 1);

        assert_eq!(
            changed_runs(&a, &b),
            vec![
                Run { x: 1, y: 0, len: 5 },
                Run { x: 11, y: 0, len: 1 },
                Run { x: 0, y: 1, len: 1 },
            ]
        );
    }

    #[test]
    fn resized_frame_is_entirely_dirty() {
        let runs = changed_runs(&FrameBuffer::new(2, 2), &FrameBuffer::new(3, 1));
        assert_eq!(runs, vec![Run { x: 0, y: 0, len: 3 }]);
        assert!(changed_runs(&FrameBuffer::new(0, 0), &FrameBuffer::new(0, 0)).is_empty());
    }

    #[test]
    fn colors_are_sent_only_on_change() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.tint(2, 0, crate::types::Color::BLUE);

        let mut out = Vec::new();
        encode_full_into(&fb, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Default fg once; bg black, blue, black again.
        assert_eq!(text.matches("\x1b[38;2;").count(), 1);
        assert_eq!(text.matches("\x1b[48;2;").count(), 3);
    }

    #[test]
    fn first_frame_is_full_then_diffs() {
        let mut renderer = TerminalRenderer::with_writer(Vec::new());
        let mut fb = FrameBuffer::new(3, 2);
        fb.put_str(0, 0, "abc", Rgb::new(1, 1, 1));
        renderer.draw(&fb).unwrap();
        let full = renderer.writer().len();
        assert!(full > 0);

        // Unchanged frame writes nothing at all.
        renderer.draw(&fb).unwrap();
        assert_eq!(renderer.writer().len(), full);

        fb.put_str(0, 1, "z", Rgb::new(1, 1, 1));
        renderer.draw(&fb).unwrap();
        let changed = renderer.writer().len() - full;
        assert!(changed > 0 && changed < full);
    }

    #[test]
    fn draw_swap_hands_back_previous_frame() {
        let mut renderer = TerminalRenderer::with_writer(Vec::new());
        let mut fb = FrameBuffer::new(2, 1);
        fb.put_str(0, 0, "hi", Rgb::new(1, 1, 1));
        renderer.draw_swap(&mut fb).unwrap();
        assert_eq!(fb, FrameBuffer::new(2, 1));
    }
}
