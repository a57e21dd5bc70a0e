//! Granular pitch shifter.
//!
//! Two read heads sweep through a short delay line at a rate set by the
//! pitch ratio, half a window apart, each faded by a Hann window so their
//! gains always sum to one. Shifting pitch this way leaves duration alone,
//! which is what lets the pitch knob work independently of playback speed.
//!
//! At 0 semitones the stage crossfades to the direct signal and becomes
//! bit-transparent once the crossfade settles.

use core::f32::consts::PI;
use libm::sinf;
use tonearm_core::{Effect, InterpolatedDelay, SmoothedParam, semitones_to_ratio};

const WINDOW_MS: f32 = 50.0;
const MIN_DELAY_SAMPLES: f32 = 2.0;

/// Pitch shifter.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Semitones | -12–12 | 0.0 |
///
/// ```rust
/// use tonearm_core::Effect;
/// use tonearm_effects::PitchShifter;
///
/// let mut shifter = PitchShifter::new(44100.0);
/// assert_eq!(shifter.process(0.4), 0.4);
/// shifter.set_semitones(4.0);
/// assert_eq!(shifter.semitones(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct PitchShifter {
    line_l: InterpolatedDelay,
    line_r: InterpolatedDelay,
    semitones: f32,
    ratio: SmoothedParam,
    /// 0 = direct signal, 1 = shifted signal
    engage: SmoothedParam,
    /// Head phase in [0, 1)
    phase: f32,
    window_samples: f32,
}

impl PitchShifter {
    /// Shifter at 0 semitones.
    pub fn new(sample_rate: f32) -> Self {
        let window_samples = WINDOW_MS / 1000.0 * sample_rate;
        let capacity = window_samples as usize + MIN_DELAY_SAMPLES as usize + 8;
        Self {
            line_l: InterpolatedDelay::new(capacity),
            line_r: InterpolatedDelay::new(capacity),
            semitones: 0.0,
            ratio: SmoothedParam::standard(1.0, sample_rate),
            engage: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            phase: 0.0,
            window_samples,
        }
    }

    /// Pitch offset in semitones.
    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = semitones.clamp(-12.0, 12.0);
        self.ratio.set_target(semitones_to_ratio(self.semitones));
        let engaged = if self.semitones.abs() > 1e-3 { 1.0 } else { 0.0 };
        self.engage.set_target(engaged);
    }

    /// Pitch offset in semitones.
    pub fn semitones(&self) -> f32 {
        self.semitones
    }

    #[inline]
    fn head(line: &InterpolatedDelay, phase: f32, window: f32) -> f32 {
        let gain = sinf(PI * phase);
        line.read(MIN_DELAY_SAMPLES + phase * window) * gain * gain
    }
}

impl Effect for PitchShifter {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.line_l.write(left);
        self.line_r.write(right);

        let mut engage = self.engage.advance();
        if self.engage.is_settled() {
            self.engage.snap_to_target();
            engage = self.engage.get();
        }
        let ratio = self.ratio.advance();
        if engage == 0.0 {
            return (left, right);
        }

        // Delay shrinks when ratio > 1, so the heads read faster than real time.
        self.phase -= (ratio - 1.0) / self.window_samples;
        self.phase = self.phase.rem_euclid(1.0);
        let other = (self.phase + 0.5).rem_euclid(1.0);
        let w = self.window_samples;

        let shifted_l = Self::head(&self.line_l, self.phase, w) + Self::head(&self.line_l, other, w);
        let shifted_r = Self::head(&self.line_r, self.phase, w) + Self::head(&self.line_r, other, w);

        (
            left + (shifted_l - left) * engage,
            right + (shifted_r - right) * engage,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let semitones = self.semitones;
        *self = Self::new(sample_rate);
        self.set_semitones(semitones);
        self.reset();
    }

    fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.ratio.snap_to_target();
        self.engage.snap_to_target();
        self.phase = 0.0;
    }

    fn latency_samples(&self) -> usize {
        if self.engage.target() > 0.0 {
            (MIN_DELAY_SAMPLES + self.window_samples * 0.5) as usize
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(x: &[f32]) -> usize {
        x.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count()
    }

    fn shifted_crossings(semitones: f32) -> usize {
        let sr = 44100.0;
        let mut shifter = PitchShifter::new(sr);
        shifter.set_semitones(semitones);
        shifter.reset();
        let out: Vec<f32> = (0..sr as usize)
            .map(|i| shifter.process(sinf(2.0 * PI * 200.0 * i as f32 / sr)))
            .collect();
        zero_crossings(&out[4410..])
    }

    #[test]
    fn test_neutral_is_transparent() {
        let mut shifter = PitchShifter::new(44100.0);
        for i in 0..1000 {
            let x = sinf(i as f32 * 0.07);
            assert_eq!(shifter.process_stereo(x, x), (x, x));
        }
    }

    #[test]
    fn test_octave_up_roughly_doubles_frequency() {
        let base = shifted_crossings(0.0) as f32;
        let up = shifted_crossings(12.0) as f32;
        assert!((up / base - 2.0).abs() < 0.2, "base {base} up {up}");
    }

    #[test]
    fn test_octave_down_roughly_halves_frequency() {
        let base = shifted_crossings(0.0) as f32;
        let down = shifted_crossings(-12.0) as f32;
        assert!((down / base - 0.5).abs() < 0.1, "base {base} down {down}");
    }

    #[test]
    fn test_clamps_range() {
        let mut shifter = PitchShifter::new(44100.0);
        shifter.set_semitones(30.0);
        assert_eq!(shifter.semitones(), 12.0);
    }
}
