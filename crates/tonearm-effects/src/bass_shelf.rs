//! Bass boost as a low shelf.

use tonearm_core::{Biquad, Effect, SmoothedParam, low_shelf_coefficients};

/// Low shelf with a fixed corner. At 0 dB the shelf is an identity filter,
/// so the stage stays wired in when the bass knob is at zero.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Gain | 0–24 dB | 0.0 |
/// | Corner | 40–500 Hz | 150.0 |
#[derive(Debug, Clone)]
pub struct BassShelf {
    left: Biquad,
    right: Biquad,
    gain_db: SmoothedParam,
    applied_db: f32,
    corner_hz: f32,
    sample_rate: f32,
}

impl BassShelf {
    /// Default corner frequency.
    pub const CORNER_HZ: f32 = 150.0;

    /// Flat shelf at 150 Hz.
    pub fn new(sample_rate: f32) -> Self {
        let mut shelf = Self {
            left: Biquad::new(),
            right: Biquad::new(),
            gain_db: SmoothedParam::standard(0.0, sample_rate),
            applied_db: 0.0,
            corner_hz: Self::CORNER_HZ,
            sample_rate,
        };
        shelf.recalculate();
        shelf
    }

    /// Set boost in dB.
    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db.set_target(gain_db.clamp(0.0, 24.0));
    }

    /// Target boost in dB.
    pub fn gain_db(&self) -> f32 {
        self.gain_db.target()
    }

    /// Move the shelf corner.
    pub fn set_corner_hz(&mut self, hz: f32) {
        self.corner_hz = hz.clamp(40.0, 500.0);
        self.recalculate();
    }

    fn recalculate(&mut self) {
        let coeffs = low_shelf_coefficients(self.corner_hz, self.applied_db, self.sample_rate);
        self.left.set_tuple(coeffs);
        self.right.set_tuple(coeffs);
    }
}

impl Effect for BassShelf {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let gain = self.gain_db.advance();
        if (gain - self.applied_db).abs() > 1e-3 {
            self.applied_db = gain;
            self.recalculate();
        }
        (self.left.process(left), self.right.process(right))
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.gain_db.set_sample_rate(sample_rate);
        self.recalculate();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.gain_db.snap_to_target();
        self.applied_db = self.gain_db.get();
        self.recalculate();
    }
}
