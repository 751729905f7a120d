//! Core types module - shared data structures and constants
//!
//! This crate defines the fundamental types used throughout the engine.
//! Everything here is plain data with no engine behavior attached, making it
//! usable in any context (scene graph, tile world, terminal rendering, persistence).
//!
//! # Coordinates
//!
//! The world is a flat plane addressed by `(x, z)` in world units. `x` grows to the
//! right and `z` grows downwards (screen order). Grid cells are addressed by
//! `(gx, gz)`, and tiles are stored row-major with linear index `gz * width + gx`.
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed frame interval (~60 FPS) |
//! | `CAMERA_FOLLOW_MS` | 4000 | Duration of the animated camera follow transition |
//! | `SPRITE_CYCLE_MS` | 600 | Time for a multi-frame sprite to cycle through all frames |
//! | `HIGHLIGHT_PULSE_MS` | 500 | Half period of the highlighted tile pulse |
//! | `DEFAULT_MOVE_DELAY_MS` | 10000 | Upper bound of the random wander re-roll delay |
//!
//! # Draw Order
//!
//! Children are kept sorted by their integer order, lower first:
//!
//! | Order | Used by |
//! |-------|---------|
//! | 0 | world background |
//! | 2 | tile render objects |
//! | z + 10 | spatial entities added without an explicit order |
//!
//! # Examples
//!
//! ```
//! use tilescape_types::{Axis, Rect, DEFAULT_TILE_W};
//!
//! let axis = Axis::from_str("both").unwrap();
//! assert_eq!(axis, Axis::Both);
//! assert!(axis.follows_horizontal());
//!
//! let view = Rect::new(0.0, 0.0, 320.0, 240.0);
//! let tile = Rect::new(300.0, 200.0, DEFAULT_TILE_W as f32, DEFAULT_TILE_W as f32);
//! assert!(view.overlaps(&tile));
//! ```

mod geometry;
mod input;
mod record;

pub use geometry::{Color, Rect};
pub use input::{InputState, Key, KeySet, PointerPoint, PointerState};
pub use record::{FrameRect, Size, TileCatalog, TileDef, TileDefId, WorldRecord, EMPTY_TILE};

/// Default tile width in world units
pub const DEFAULT_TILE_W: u32 = 32;

/// Default tile height in world units
pub const DEFAULT_TILE_H: u32 = 32;

/// Fixed frame interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Default display (viewport) width in world units
pub const DEFAULT_DISPLAY_WIDTH: u32 = 800;

/// Default display (viewport) height in world units
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 600;

/// Duration of the animated camera follow transition
pub const CAMERA_FOLLOW_MS: u32 = 4000;

/// Time for a multi-frame sprite to cycle through all of its frames
pub const SPRITE_CYCLE_MS: u32 = 600;

/// Half period of the highlighted tile pulse
pub const HIGHLIGHT_PULSE_MS: u32 = 500;

/// Upper bound of the random delay before a wandering entity picks a new target
pub const DEFAULT_MOVE_DELAY_MS: u32 = 10_000;

/// Default movement speed in world units per second
pub const DEFAULT_SPEED: f32 = 200.0;

/// Keyboard steering turns by `speed / TURN_RATE_DIVISOR` radians per tick
pub const TURN_RATE_DIVISOR: f32 = 2000.0;

/// Order offset applied to `z` for spatial nodes added without an explicit order
pub const SPATIAL_ORDER_OFFSET: i32 = 10;

/// Order of the world background render object
pub const BACKGROUND_ORDER: i32 = 0;

/// Order of tile render objects
pub const TILE_RENDER_ORDER: i32 = 2;

/// World id used when nothing was opened before
pub const DEFAULT_WORLD_ID: &str = "default";

/// Axis constraint for camera following
///
/// - **None**: the camera never follows
/// - **Horizontal**: only `x` follows the subject
/// - **Vertical**: only `z` follows the subject
/// - **Both**: both axes follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    None,
    Horizontal,
    Vertical,
    #[default]
    Both,
}

impl Axis {
    /// Parse axis from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tilescape_types::Axis;
    ///
    /// assert_eq!(Axis::from_str("none"), Some(Axis::None));
    /// assert_eq!(Axis::from_str("Horizontal"), Some(Axis::Horizontal));
    /// assert_eq!(Axis::from_str("diagonal"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Axis::None),
            "horizontal" => Some(Axis::Horizontal),
            "vertical" => Some(Axis::Vertical),
            "both" => Some(Axis::Both),
            _ => None,
        }
    }

    /// Convert to lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::None => "none",
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
            Axis::Both => "both",
        }
    }

    pub fn follows_horizontal(&self) -> bool {
        matches!(self, Axis::Horizontal | Axis::Both)
    }

    pub fn follows_vertical(&self) -> bool {
        matches!(self, Axis::Vertical | Axis::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_constants_keep_background_below_tiles() {
        assert!(BACKGROUND_ORDER < TILE_RENDER_ORDER);
        assert!(TILE_RENDER_ORDER < SPATIAL_ORDER_OFFSET);
    }

    #[test]
    fn axis_round_trips_through_str() {
        for axis in [Axis::None, Axis::Horizontal, Axis::Vertical, Axis::Both] {
            assert_eq!(Axis::from_str(axis.as_str()), Some(axis));
        }
        assert!(!Axis::None.follows_horizontal());
        assert!(!Axis::Horizontal.follows_vertical());
        assert!(Axis::Vertical.follows_vertical());
    }
}
