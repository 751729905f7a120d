//! Terminal rendering module.
//!
//! A small rendering layer for running the engine in a terminal. It avoids
//! widget/layout libraries and instead renders into a simple framebuffer that
//! is flushed to the terminal backend.
//!
//! - [`TermSurface`] implements the engine's drawing surface over a [`FrameBuffer`]
//! - [`TerminalRenderer`] writes frames as full redraws or diffed runs
//! - [`render_status`] draws the status line
//!
//! Each terminal cell covers a fixed number of world units per column and row
//! (8x16 by default), which keeps square tiles roughly square on screen.

pub mod fb;
pub mod renderer;
pub mod status;
pub mod surface;

pub use tilescape_core as core;
pub use tilescape_types as types;

pub use fb::{Cell, CellRect, CellStyle, FrameBuffer, Rgb};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
pub use status::{render_status, StatusInfo};
pub use surface::{TermSurface, DEFAULT_UNIT_H, DEFAULT_UNIT_W};
