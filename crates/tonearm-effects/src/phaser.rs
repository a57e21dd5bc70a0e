//! Phaser: cascaded first-order allpasses swept by an LFO.

use core::f32::consts::PI;
use libm::{powf, tanf};
use tonearm_core::{Effect, Lfo, LfoWaveform, SmoothedParam, flush_denormal, wet_dry_mix};

const STAGES: usize = 6;
const COEFF_UPDATE_INTERVAL: u32 = 32;

#[derive(Debug, Clone, Copy, Default)]
struct FirstOrderAllpass {
    a: f32,
    x1: f32,
    y1: f32,
}

impl FirstOrderAllpass {
    #[inline]
    fn set_frequency(&mut self, freq: f32, sample_rate: f32) {
        let freq = freq.clamp(10.0, sample_rate * 0.4);
        let t = tanf(PI * freq / sample_rate);
        self.a = (t - 1.0) / (t + 1.0);
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.a * input + self.x1 - self.a * self.y1;
        self.x1 = input;
        self.y1 = flush_denormal(output);
        output
    }

    fn clear(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

/// Six-stage phaser with a triangle sweep between 200 Hz and 4 kHz.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Rate | 0.05–5.0 Hz | 0.4 |
/// | Depth | 0–1 | 0.8 |
/// | Feedback | 0–0.9 | 0.4 |
/// | Mix | 0–1 | 1.0 |
#[derive(Debug, Clone)]
pub struct Phaser {
    stages_l: [FirstOrderAllpass; STAGES],
    stages_r: [FirstOrderAllpass; STAGES],
    lfo_l: Lfo,
    lfo_r: Lfo,
    rate: SmoothedParam,
    depth: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    fb_state: [f32; 2],
    sample_rate: f32,
    coeff_update_counter: u32,
}

impl Phaser {
    const MIN_FREQ: f32 = 200.0;
    const MAX_FREQ: f32 = 4000.0;

    /// Create a fully wet phaser.
    pub fn new(sample_rate: f32) -> Self {
        let mut lfo_l = Lfo::new(sample_rate, 0.4);
        lfo_l.set_waveform(LfoWaveform::Triangle);
        let mut lfo_r = lfo_l.clone();
        lfo_r.set_phase(0.25);

        Self {
            stages_l: [FirstOrderAllpass::default(); STAGES],
            stages_r: [FirstOrderAllpass::default(); STAGES],
            lfo_l,
            lfo_r,
            rate: SmoothedParam::standard(0.4, sample_rate),
            depth: SmoothedParam::standard(0.8, sample_rate),
            feedback: SmoothedParam::standard(0.4, sample_rate),
            mix: SmoothedParam::standard(1.0, sample_rate),
            fb_state: [0.0; 2],
            sample_rate,
            coeff_update_counter: 1,
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

    fn sweep_frequency(lfo: f32, depth: f32) -> f32 {
        // Exponential sweep so the notches move evenly in pitch.
        Self::MIN_FREQ * powf(Self::MAX_FREQ / Self::MIN_FREQ, lfo * depth)
    }
}

impl Effect for Phaser {
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
        let lfo_l = self.lfo_l.next_unipolar();
        let lfo_r = self.lfo_r.next_unipolar();

        self.coeff_update_counter -= 1;
        if self.coeff_update_counter == 0 {
            self.coeff_update_counter = COEFF_UPDATE_INTERVAL;
            let centre_l = Self::sweep_frequency(lfo_l, depth);
            let centre_r = Self::sweep_frequency(lfo_r, depth);
            for i in 0..STAGES {
                let spread = 1.0 + i as f32 * 0.1;
                self.stages_l[i].set_frequency(centre_l * spread, self.sample_rate);
                self.stages_r[i].set_frequency(centre_r * spread, self.sample_rate);
            }
        }

        let mut wet_l = left + self.fb_state[0] * feedback;
        let mut wet_r = right + self.fb_state[1] * feedback;
        for i in 0..STAGES {
            wet_l = self.stages_l[i].process(wet_l);
            wet_r = self.stages_r[i].process(wet_r);
        }
        self.fb_state = [flush_denormal(wet_l), flush_denormal(wet_r)];

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
        for (l, r) in self.stages_l.iter_mut().zip(self.stages_r.iter_mut()) {
            l.clear();
            r.clear();
        }
        self.fb_state = [0.0; 2];
        self.lfo_l.reset();
        self.lfo_r.set_phase(0.25);
        self.coeff_update_counter = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allpass_preserves_energy() {
        let mut ap = FirstOrderAllpass::default();
        ap.set_frequency(1000.0, 48000.0);
        let mut energy_in = 0.0;
        let mut energy_out = 0.0;
        for i in 0..48000 {
            let x = libm::sinf(i as f32 * 0.05);
            let y = ap.process(x);
            if i > 1000 {
                energy_in += x * x;
                energy_out += y * y;
            }
        }
        assert!((energy_out / energy_in - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_phaser_finite() {
        let mut phaser = Phaser::new(44100.0);
        phaser.set_feedback(0.9);
        for i in 0..44100 {
            let x = libm::sinf(i as f32 * 0.01);
            let (l, r) = phaser.process_stereo(x, x);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
