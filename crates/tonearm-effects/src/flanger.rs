//! Flanger, the short-delay modulation flavour.

use libm::ceilf;
use tonearm_core::{
    Effect, InterpolatedDelay, Interpolation, Lfo, SmoothedParam, flush_denormal, wet_dry_mix,
};

/// Flanger with feedback. The right channel's LFO runs a quarter cycle
/// ahead for width.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Rate | 0.05–5.0 Hz | 0.25 |
/// | Depth | 0–1 | 0.7 |
/// | Feedback | 0–0.9 | 0.5 |
/// | Mix | 0–1 | 1.0 |
#[derive(Debug, Clone)]
pub struct Flanger {
    line_l: InterpolatedDelay,
    line_r: InterpolatedDelay,
    lfo_l: Lfo,
    lfo_r: Lfo,
    base_samples: f32,
    sweep_samples: f32,
    rate: SmoothedParam,
    depth: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    fb_state: [f32; 2],
}

impl Flanger {
    const BASE_MS: f32 = 1.0;
    const SWEEP_MS: f32 = 6.0;

    /// Create a fully wet flanger.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = ceilf((Self::BASE_MS + Self::SWEEP_MS) / 1000.0 * sample_rate) as usize + 4;
        let mut line_l = InterpolatedDelay::new(capacity);
        let mut line_r = InterpolatedDelay::new(capacity);
        line_l.set_interpolation(Interpolation::Cubic);
        line_r.set_interpolation(Interpolation::Cubic);
        let mut lfo_r = Lfo::new(sample_rate, 0.25);
        lfo_r.set_phase(0.25);

        Self {
            line_l,
            line_r,
            lfo_l: Lfo::new(sample_rate, 0.25),
            lfo_r,
            base_samples: Self::BASE_MS / 1000.0 * sample_rate,
            sweep_samples: Self::SWEEP_MS / 1000.0 * sample_rate,
            rate: SmoothedParam::standard(0.25, sample_rate),
            depth: SmoothedParam::standard(0.7, sample_rate),
            feedback: SmoothedParam::standard(0.5, sample_rate),
            mix: SmoothedParam::standard(1.0, sample_rate),
            fb_state: [0.0; 2],
        }
    }

    /// LFO rate in Hz.
    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate.set_target(rate_hz.clamp(0.05, 5.0));
    }

    /// Sweep depth (0–1).
    pub fn set_depth(&mut self, depth: f32) {
        self.depth.set_target(depth.clamp(0.0, 1.0));
    }

    /// Feedback (0–0.9).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback.clamp(0.0, 0.9));
    }

    /// Wet/dry mix (0–1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }
}

impl Effect for Flanger {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let rate = self.rate.advance();
        let depth = self.depth.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();
        self.lfo_l.set_frequency(rate);
        self.lfo_r.set_frequency(rate);

        let t_l = self.base_samples + self.lfo_l.next_unipolar() * depth * self.sweep_samples;
        let t_r = self.base_samples + self.lfo_r.next_unipolar() * depth * self.sweep_samples;
        let wet_l = self.line_l.read(t_l);
        let wet_r = self.line_r.read(t_r);

        self.line_l.write(flush_denormal(left + self.fb_state[0] * feedback));
        self.line_r.write(flush_denormal(right + self.fb_state[1] * feedback));
        self.fb_state = [wet_l, wet_r];

        // Scale so heavy feedback does not push the return far above unity.
        let comp = 1.0 - feedback * 0.5;
        (
            wet_dry_mix(left, wet_l * comp, mix),
            wet_dry_mix(right, wet_r * comp, mix),
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        *self = Self::new(sample_rate);
    }

    fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.fb_state = [0.0; 2];
        self.lfo_l.reset();
        self.lfo_r.set_phase(0.25);
    }
}
