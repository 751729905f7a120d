//! Frame clock.

use std::time::Instant;

/// Computes the per-tick delta and the absolute time of each frame.
///
/// Time is in milliseconds since the clock was created; the delta is in
/// seconds. The first tick reports a zero delta.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last_ms: Option<f64>,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_ms: None,
            frames: 0,
        }
    }

    /// Milliseconds elapsed since creation.
    pub fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Advance to `now_ms` and return `(dt_seconds, now_ms)`.
    ///
    /// A timestamp older than the previous one yields a zero delta.
    pub fn tick(&mut self, now_ms: f64) -> (f32, f64) {
        let dt_ms = match self.last_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_ms = Some(now_ms.max(self.last_ms.unwrap_or(now_ms)));
        self.frames += 1;
        ((dt_ms / 1000.0) as f32, now_ms)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms
    }
}
