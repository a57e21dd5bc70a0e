//! Dual-voice chorus, one of the three modulation flavours.

use libm::ceilf;
use tonearm_core::{Effect, InterpolatedDelay, Interpolation, Lfo, SmoothedParam, wet_dry_mix};

/// Chorus with two voices 90 degrees apart, voice 1 on the left and voice 2
/// on the right.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Rate | 0.1–10.0 Hz | 0.8 |
/// | Depth | 0–1 | 0.5 |
/// | Mix | 0–1 | 1.0 |
#[derive(Debug, Clone)]
pub struct Chorus {
    delay1: InterpolatedDelay,
    delay2: InterpolatedDelay,
    lfo1: Lfo,
    lfo2: Lfo,
    base_delay_samples: f32,
    max_mod_samples: f32,
    rate: SmoothedParam,
    depth: SmoothedParam,
    mix: SmoothedParam,
}

impl Chorus {
    const BASE_DELAY_MS: f32 = 15.0;
    const MAX_MOD_MS: f32 = 5.0;

    /// Create a fully wet chorus.
    pub fn new(sample_rate: f32) -> Self {
        let base_delay_samples = Self::BASE_DELAY_MS / 1000.0 * sample_rate;
        let max_mod_samples = Self::MAX_MOD_MS / 1000.0 * sample_rate;
        let capacity =
            ceilf((Self::BASE_DELAY_MS + Self::MAX_MOD_MS) / 1000.0 * sample_rate) as usize + 4;

        let mut delay1 = InterpolatedDelay::new(capacity);
        let mut delay2 = InterpolatedDelay::new(capacity);
        delay1.set_interpolation(Interpolation::Cubic);
        delay2.set_interpolation(Interpolation::Cubic);

        let lfo1 = Lfo::new(sample_rate, 0.8);
        let mut lfo2 = Lfo::new(sample_rate, 0.8);
        lfo2.set_phase(0.25);

        Self {
            delay1,
            delay2,
            lfo1,
            lfo2,
            base_delay_samples,
            max_mod_samples,
            rate: SmoothedParam::standard(0.8, sample_rate),
            depth: SmoothedParam::standard(0.5, sample_rate),
            mix: SmoothedParam::standard(1.0, sample_rate),
        }
    }

    /// LFO rate in Hz.
    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate.set_target(rate_hz.clamp(0.1, 10.0));
    }

    /// Modulation depth (0–1).
    pub fn set_depth(&mut self, depth: f32) {
        self.depth.set_target(depth.clamp(0.0, 1.0));
    }

    /// Wet/dry mix (0–1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }

    #[inline]
    fn voices(&mut self, left: f32, right: f32) -> (f32, f32, f32) {
        let rate = self.rate.advance();
        let depth = self.depth.advance();
        let mix = self.mix.advance();
        self.lfo1.set_frequency(rate);
        self.lfo2.set_frequency(rate);

        let t1 = self.base_delay_samples + self.lfo1.next() * depth * self.max_mod_samples;
        let t2 = self.base_delay_samples + self.lfo2.next() * depth * self.max_mod_samples;
        let wet1 = self.delay1.read(t1);
        let wet2 = self.delay2.read(t2);
        self.delay1.write(left);
        self.delay2.write(right);
        (wet1, wet2, mix)
    }
}

impl Effect for Chorus {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (wet1, wet2, mix) = self.voices(input, input);
        wet_dry_mix(input, (wet1 + wet2) * 0.5, mix)
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (wet1, wet2, mix) = self.voices(left, right);
        (wet_dry_mix(left, wet1, mix), wet_dry_mix(right, wet2, mix))
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        *self = Self::new(sample_rate);
    }

    fn reset(&mut self) {
        self.delay1.clear();
        self.delay2.clear();
        self.lfo1.reset();
        self.lfo2.set_phase(0.25);
        self.rate.snap_to_target();
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}
