//! Dynamics compressor with soft knee.
//!
//! Feed-forward design, stereo linked: the envelope is taken from the mid
//! signal so both channels get identical gain reduction.
//!
//! ```text
//! Input → Envelope Follower → Gain Computer → Gain Reduction → Output
//!                                    ↓
//!                              Makeup Gain
//! ```
//!
//! With the threshold at 0 dB nothing in a normalised track reaches the knee,
//! which is how the player's compressor knob expresses "off".

use tonearm_core::{Effect, EnvelopeFollower, SmoothedParam, db_to_linear, linear_to_db};

#[derive(Debug, Clone)]
struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

impl GainComputer {
    #[inline]
    fn compute_gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 - 1.0 / self.ratio;

        if overshoot <= -half_knee {
            0.0
        } else if overshoot > half_knee || self.knee_db <= 0.0 {
            -(overshoot * slope)
        } else {
            let knee_factor = (overshoot + half_knee) / self.knee_db;
            -(knee_factor * knee_factor * overshoot * slope)
        }
    }
}

/// Dynamics compressor.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Threshold | -60.0–0.0 dB | 0.0 |
/// | Ratio | 1.0–20.0 | 4.0 |
/// | Attack | 0.1–100.0 ms | 10.0 |
/// | Release | 10.0–1000.0 ms | 250.0 |
/// | Makeup Gain | 0.0–24.0 dB | 0.0 |
/// | Knee | 0.0–12.0 dB | 6.0 |
///
/// ```rust
/// use tonearm_core::Effect;
/// use tonearm_effects::Compressor;
///
/// let mut comp = Compressor::new(44100.0);
/// comp.set_threshold_db(-20.0);
/// let output = comp.process(0.5);
/// assert!(output.abs() <= 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    envelope_follower: EnvelopeFollower,
    gain_computer: GainComputer,
    threshold_db: SmoothedParam,
    makeup_gain: SmoothedParam,
    last_gain_reduction_db: f32,
}

impl Compressor {
    /// Create with the threshold at 0 dB.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            envelope_follower: EnvelopeFollower::with_times(sample_rate, 10.0, 250.0),
            gain_computer: GainComputer {
                threshold_db: 0.0,
                ratio: 4.0,
                knee_db: 6.0,
            },
            threshold_db: SmoothedParam::standard(0.0, sample_rate),
            makeup_gain: SmoothedParam::standard(1.0, sample_rate),
            last_gain_reduction_db: 0.0,
        }
    }

    /// Set threshold in dB.
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db.set_target(threshold_db.clamp(-60.0, 0.0));
    }

    /// Target threshold in dB.
    pub fn threshold_db(&self) -> f32 {
        self.threshold_db.target()
    }

    /// Set compression ratio.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.gain_computer.ratio = ratio.clamp(1.0, 20.0);
    }

    /// Set attack in ms.
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.envelope_follower.set_attack_ms(attack_ms.clamp(0.1, 100.0));
    }

    /// Set release in ms.
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.envelope_follower.set_release_ms(release_ms.clamp(10.0, 1000.0));
    }

    /// Set knee width in dB.
    pub fn set_knee_db(&mut self, knee_db: f32) {
        self.gain_computer.knee_db = knee_db.clamp(0.0, 12.0);
    }

    /// Set makeup gain in dB.
    pub fn set_makeup_gain_db(&mut self, gain_db: f32) {
        self.makeup_gain.set_target(db_to_linear(gain_db.clamp(0.0, 24.0)));
    }

    /// Last gain reduction in dB (never positive).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_gain_reduction_db
    }
}

impl Effect for Compressor {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.gain_computer.threshold_db = self.threshold_db.advance();
        let envelope = self.envelope_follower.process((left + right) * 0.5);
        let gain_reduction_db = self.gain_computer.compute_gain_db(linear_to_db(envelope));
        self.last_gain_reduction_db = gain_reduction_db;
        let gain = db_to_linear(gain_reduction_db) * self.makeup_gain.advance();
        (left * gain, right * gain)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.envelope_follower.set_sample_rate(sample_rate);
        self.threshold_db.set_sample_rate(sample_rate);
        self.makeup_gain.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.envelope_follower.reset();
        self.threshold_db.snap_to_target();
        self.makeup_gain.snap_to_target();
        self.last_gain_reduction_db = 0.0;
    }
}
