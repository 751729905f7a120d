//! Minimal easing tween used by the camera follow transition and the
//! highlighted-tile pulse.

/// Easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    QuadraticOut,
}

impl Easing {
    /// Map linear progress `k` in `[0, 1]` onto the curve.
    pub fn apply(self, k: f32) -> f32 {
        let k = k.clamp(0.0, 1.0);
        match self {
            Easing::Linear => k,
            Easing::QuadraticOut => k * (2.0 - k),
        }
    }
}

/// Time-based interpolation from a fixed start point towards a (possibly moving) target.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    from: (f32, f32),
    elapsed_ms: f32,
    duration_ms: f32,
    easing: Easing,
}

impl Tween {
    pub fn new(from: (f32, f32), duration_ms: f32, easing: Easing) -> Self {
        Self {
            from,
            elapsed_ms: 0.0,
            duration_ms: duration_ms.max(1.0),
            easing,
        }
    }

    /// Advance by `dt_ms` and return the eased point between `from` and `to`.
    pub fn advance(&mut self, dt_ms: f32, to: (f32, f32)) -> (f32, f32) {
        self.elapsed_ms = (self.elapsed_ms + dt_ms.max(0.0)).min(self.duration_ms);
        let k = self.easing.apply(self.progress());
        (
            self.from.0 + (to.0 - self.from.0) * k,
            self.from.1 + (to.1 - self.from.1) * k,
        )
    }

    pub fn progress(&self) -> f32 {
        self.elapsed_ms / self.duration_ms
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// Triangle wave in `[0, 1]`: rises over `half_period_ms`, then falls back.
pub fn yoyo(elapsed_ms: f64, half_period_ms: f64) -> f32 {
    if half_period_ms <= 0.0 {
        return 1.0;
    }
    let phase = (elapsed_ms.max(0.0) / half_period_ms) % 2.0;
    let v = if phase <= 1.0 { phase } else { 2.0 - phase };
    v as f32
}
