//! Zero-latency brickwall limiter.
//!
//! The last stage before master gain. Gain follows the instantaneous peak
//! down immediately and releases exponentially, so output never exceeds the
//! ceiling and no lookahead delay is added to the graph. Live playback and
//! offline export therefore stay sample-aligned.
//!
//! `g[n] = target` when `target < g[n-1]`, otherwise
//! `g[n] = rc * g[n-1] + (1 - rc) * target`. Since `g[n] <= target` in both
//! branches, `|x| * g[n] <= ceiling`.

use libm::expf;
use tonearm_core::{Effect, db_to_linear};

/// Brickwall peak limiter, stereo linked.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Ceiling | -12–0 dB | -0.3 |
/// | Release | 10–1000 ms | 120.0 |
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling_db: f32,
    ceiling: f32,
    release_ms: f32,
    release_coeff: f32,
    gain: f32,
    sample_rate: f32,
}

impl Limiter {
    /// Limiter at -0.3 dBFS.
    pub fn new(sample_rate: f32) -> Self {
        let mut limiter = Self {
            ceiling_db: -0.3,
            ceiling: db_to_linear(-0.3),
            release_ms: 120.0,
            release_coeff: 0.0,
            gain: 1.0,
            sample_rate,
        };
        limiter.recalculate_release();
        limiter
    }

    /// Set the output ceiling in dBFS.
    pub fn set_ceiling_db(&mut self, db: f32) {
        self.ceiling_db = db.clamp(-12.0, 0.0);
        self.ceiling = db_to_linear(self.ceiling_db);
    }

    /// Ceiling in dBFS.
    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db
    }

    /// Set release in ms.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.clamp(10.0, 1000.0);
        self.recalculate_release();
    }

    /// Current linear gain (1.0 = no reduction).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn recalculate_release(&mut self) {
        self.release_coeff = expf(-1.0 / (self.release_ms / 1000.0 * self.sample_rate));
    }
}

impl Effect for Limiter {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        let target = if peak > self.ceiling {
            self.ceiling / peak
        } else {
            1.0
        };
        self.gain = if target < self.gain {
            target
        } else if self.gain < target {
            self.release_coeff * self.gain + (1.0 - self.release_coeff) * target
        } else {
            self.gain
        };
        (left * self.gain, right * self.gain)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_release();
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }
}
