//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use tilescape_core::WorldOptions;
use tilescape_types::{DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, TICK_MS};

/// Runtime settings of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub assets_dir: PathBuf,
    pub save_dir: PathBuf,
    /// World to open; `None` falls back to the last opened one
    pub world: Option<String>,
    pub tick_ms: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub sound: bool,
    pub volume: f32,
    pub draw_grid: bool,
    pub log_path: Option<String>,
    pub dev: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            save_dir: PathBuf::from("saves"),
            world: None,
            tick_ms: TICK_MS,
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            sound: true,
            volume: 0.7,
            draw_grid: true,
            log_path: None,
            dev: false,
        }
    }
}

impl EngineConfig {
    /// Create from `TILESCAPE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from any key lookup; unset or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let flag = |key: &str, default: bool| text(key).map(|v| parse_flag(&v)).unwrap_or(default);

        let (display_width, display_height) = text("TILESCAPE_DISPLAY")
            .and_then(|s| parse_display(&s))
            .unwrap_or((defaults.display_width, defaults.display_height));

        Self {
            assets_dir: text("TILESCAPE_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            save_dir: text("TILESCAPE_SAVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.save_dir),
            world: text("TILESCAPE_WORLD"),
            tick_ms: text("TILESCAPE_TICK_MS")
                .and_then(|s| s.parse().ok())
                .filter(|&ms| ms > 0)
                .unwrap_or(defaults.tick_ms),
            display_width,
            display_height,
            sound: flag("TILESCAPE_SOUND", defaults.sound),
            volume: text("TILESCAPE_VOLUME")
                .and_then(|s| s.parse::<f32>().ok())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.volume),
            draw_grid: flag("TILESCAPE_DRAW_GRID", defaults.draw_grid),
            log_path: text("TILESCAPE_LOG_PATH"),
            dev: flag("TILESCAPE_DEV", defaults.dev),
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms as u64)
    }

    /// World options derived from the sound and grid switches.
    pub fn world_options(&self) -> WorldOptions {
        WorldOptions {
            draw_grid: self.draw_grid,
            play_music: self.sound,
            volume: self.volume,
            ..WorldOptions::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

/// `WIDTHxHEIGHT`, both positive.
fn parse_display(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}
