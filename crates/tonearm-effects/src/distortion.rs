//! Tanh waveshaping distortion.
//!
//! The graph only connects this stage while the distortion knob is above
//! zero, so there is no neutral setting to worry about here: the minimum
//! drive still colours the signal slightly.
//!
//! # Signal Flow
//!
//! ```text
//! Input → Drive → tanh → Normalise → Tone (one-pole LP) → Level → Output
//! ```

use libm::{expf, tanhf};
use tonearm_core::{Effect, SmoothedParam, db_to_linear, flush_denormal, soft_clip};

/// Waveshaping distortion.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Drive | 0–40 dB | 12.0 |
/// | Tone | 500–16000 Hz | 9000.0 |
/// | Level | -24–6 dB | 0.0 |
///
/// ```rust
/// use tonearm_core::Effect;
/// use tonearm_effects::Distortion;
///
/// let mut dist = Distortion::new(44100.0);
/// dist.set_drive_db(24.0);
/// let out = dist.process(0.5);
/// assert!(out.abs() <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Distortion {
    drive: SmoothedParam,
    level: SmoothedParam,
    tone_hz: f32,
    tone_coeff: f32,
    tone_state: [f32; 2],
    sample_rate: f32,
}

impl Distortion {
    /// Create with 12 dB drive.
    pub fn new(sample_rate: f32) -> Self {
        let mut dist = Self {
            drive: SmoothedParam::fast(db_to_linear(12.0), sample_rate),
            level: SmoothedParam::standard(1.0, sample_rate),
            tone_hz: 9000.0,
            tone_coeff: 0.0,
            tone_state: [0.0; 2],
            sample_rate,
        };
        dist.recalculate_tone_coeff();
        dist
    }

    /// Set drive in dB.
    pub fn set_drive_db(&mut self, db: f32) {
        self.drive.set_target(db_to_linear(db.clamp(0.0, 40.0)));
    }

    /// Target drive in dB.
    pub fn drive_db(&self) -> f32 {
        tonearm_core::linear_to_db(self.drive.target())
    }

    /// Set output level in dB.
    pub fn set_level_db(&mut self, db: f32) {
        self.level.set_target(db_to_linear(db.clamp(-24.0, 6.0)));
    }

    /// Set tone filter corner.
    pub fn set_tone_hz(&mut self, hz: f32) {
        self.tone_hz = hz.clamp(500.0, 16000.0);
        self.recalculate_tone_coeff();
    }

    fn recalculate_tone_coeff(&mut self) {
        let hz = self.tone_hz.min(self.sample_rate * 0.45);
        self.tone_coeff = 1.0 - expf(-2.0 * core::f32::consts::PI * hz / self.sample_rate);
    }

    #[inline]
    fn shape(x: f32, drive: f32) -> f32 {
        // Normalise so a full-scale input still peaks at full scale.
        soft_clip(x * drive) / tanhf(drive)
    }
}

impl Effect for Distortion {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let drive = self.drive.advance();
        let level = self.level.advance();
        let mut out = [Self::shape(left, drive), Self::shape(right, drive)];
        for (ch, sample) in out.iter_mut().enumerate() {
            self.tone_state[ch] =
                flush_denormal(self.tone_state[ch] + self.tone_coeff * (*sample - self.tone_state[ch]));
            *sample = self.tone_state[ch] * level;
        }
        (out[0], out[1])
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.drive.set_sample_rate(sample_rate);
        self.level.set_sample_rate(sample_rate);
        self.recalculate_tone_coeff();
    }

    fn reset(&mut self) {
        self.tone_state = [0.0; 2];
        self.drive.snap_to_target();
        self.level.snap_to_target();
    }
}
