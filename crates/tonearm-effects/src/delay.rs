//! Feedback echo for the delay send.

use libm::ceilf;
use tonearm_core::{Effect, InterpolatedDelay, SmoothedParam, flush_denormal};

/// Stereo feedback delay.
///
/// On the send bus it runs at mix 1.0 (echoes only); the bus return gain
/// decides how much reaches the output.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Delay Time | 1.0–2000.0 ms | 350.0 |
/// | Feedback | 0–95% | 35.0 |
/// | Mix | 0–100% | 100.0 |
///
/// ```rust
/// use tonearm_core::Effect;
/// use tonearm_effects::Delay;
///
/// let mut delay = Delay::new(44100.0);
/// delay.set_delay_time_ms(250.0);
/// delay.set_feedback(0.4);
/// assert_eq!(delay.process(1.0), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Delay {
    line_l: InterpolatedDelay,
    line_r: InterpolatedDelay,
    max_delay_samples: f32,
    delay_time: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    sample_rate: f32,
}

impl Delay {
    /// Default echo time.
    pub const DEFAULT_TIME_MS: f32 = 350.0;

    /// Create with a 2 second maximum.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_max_delay_ms(sample_rate, 2000.0)
    }

    /// Create with a custom maximum delay.
    pub fn with_max_delay_ms(sample_rate: f32, max_delay_ms: f32) -> Self {
        let max_delay_samples = ceilf((max_delay_ms / 1000.0) * sample_rate) as usize;
        let max_f = max_delay_samples as f32;
        let default_samples = (Self::DEFAULT_TIME_MS / 1000.0 * sample_rate).min(max_f - 4.0);

        Self {
            line_l: InterpolatedDelay::new(max_delay_samples),
            line_r: InterpolatedDelay::new(max_delay_samples),
            max_delay_samples: max_f,
            delay_time: SmoothedParam::slow(default_samples, sample_rate),
            feedback: SmoothedParam::standard(0.35, sample_rate),
            mix: SmoothedParam::standard(1.0, sample_rate),
            sample_rate,
        }
    }

    /// Set delay time in ms.
    pub fn set_delay_time_ms(&mut self, delay_ms: f32) {
        let samples = (delay_ms / 1000.0) * self.sample_rate;
        self.delay_time
            .set_target(samples.clamp(1.0, self.max_delay_samples - 4.0));
    }

    /// Delay time in ms.
    pub fn delay_time_ms(&self) -> f32 {
        self.delay_time.target() * 1000.0 / self.sample_rate
    }

    /// Set feedback (0–0.95).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback.clamp(0.0, 0.95));
    }

    /// Set wet/dry mix (0–1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }
}

impl Effect for Delay {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delay_samples = self.delay_time.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let delayed = self.line_l.read(delay_samples);
        self.line_l.write(flush_denormal(input + delayed * feedback));
        input * (1.0 - mix) + delayed * mix
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let delay_samples = self.delay_time.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let delayed_l = self.line_l.read(delay_samples);
        let delayed_r = self.line_r.read(delay_samples);
        self.line_l.write(flush_denormal(left + delayed_l * feedback));
        self.line_r.write(flush_denormal(right + delayed_r * feedback));

        (
            left * (1.0 - mix) + delayed_l * mix,
            right * (1.0 - mix) + delayed_r * mix,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let time_ms = self.delay_time_ms();
        let feedback = self.feedback.target();
        let mix = self.mix.target();
        *self = Self::new(sample_rate);
        self.set_delay_time_ms(time_ms);
        self.set_feedback(feedback);
        self.set_mix(mix);
        self.reset();
    }

    fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.delay_time.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_arrives_after_delay_time() {
        let sr = 1000.0;
        let mut delay = Delay::new(sr);
        delay.set_delay_time_ms(100.0);
        delay.set_feedback(0.5);
        delay.reset();

        let mut out = vec![delay.process(1.0)];
        for _ in 0..250 {
            out.push(delay.process(0.0));
        }
        let first = out.iter().position(|&s| s.abs() > 0.5).unwrap();
        assert!((99..=101).contains(&first), "first echo at {first}");
        let second_peak = out[190..215].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((second_peak - 0.5).abs() < 0.1, "feedback echo {second_peak}");
    }

    #[test]
    fn test_fully_wet_mutes_direct_signal() {
        let mut delay = Delay::new(44100.0);
        delay.reset();
        let (l, r) = delay.process_stereo(0.7, -0.7);
        assert_eq!((l, r), (0.0, 0.0));
    }
}
