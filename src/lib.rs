//! Tilescape (workspace facade crate).
//!
//! This package re-exports the member crates under `tilescape::{core,engine,input,term,types}`
//! and ships the built-in [`demo`] content used by the `tilescape` binary.

pub mod demo;

pub use tilescape_core as core;
pub use tilescape_engine as engine;
pub use tilescape_input as input;
pub use tilescape_term as term;
pub use tilescape_types as types;
