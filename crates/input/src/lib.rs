//! Terminal input module (engine-facing).
//!
//! This crate is independent of any UI framework. It maps `crossterm` key and
//! mouse events into the engine's [`InputState`](crate::types::InputState) and
//! tracks held keys in terminals without key-release events.

pub mod handler;
pub mod map;

pub use tilescape_types as types;

pub use handler::InputHandler;
pub use map::{apply_mouse_event, map_key, should_quit, CellScale};
