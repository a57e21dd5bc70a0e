//! Stereo balance and spatial placement.
//!
//! Two controls feed one stage:
//!
//! - **Pan** (-1..1) uses the stereo-input balance law: at 0 both channels
//!   pass untouched; moving left folds the right channel into the left with
//!   an equal-power curve, and vice versa.
//! - **Azimuth** (-180..180 degrees, 0 = straight ahead, positive = right)
//!   adds a lateral offset to the pan, an interaural delay of up to 0.6 ms on
//!   the far ear, head-shadow darkening on the far ear and a rear attenuation
//!   behind the listener.
//!
//! With both controls at zero the stage is bit-transparent.

use core::f32::consts::PI;
use libm::{cosf, expf, sinf};
use tonearm_core::{
    Effect, InterpolatedDelay, SmoothedParam, equal_power_pan, flush_denormal, wet_dry_mix,
};

const MAX_ITD_MS: f32 = 0.6;
const SHADOW_CUTOFF_HZ: f32 = 3000.0;
const REAR_ATTENUATION: f32 = 0.3;

/// Stereo/spatial panner.
///
/// | Parameter | Range | Default |
/// |-----------|-------|---------|
/// | Pan | -1.0–1.0 | 0.0 |
/// | Azimuth | -180–180 deg | 0.0 |
#[derive(Debug, Clone)]
pub struct Panner {
    pan: SmoothedParam,
    azimuth: SmoothedParam,
    itd_l: InterpolatedDelay,
    itd_r: InterpolatedDelay,
    shadow_state: [f32; 2],
    shadow_coeff: f32,
    max_itd_samples: f32,
}

impl Panner {
    /// Centred panner.
    pub fn new(sample_rate: f32) -> Self {
        let max_itd_samples = MAX_ITD_MS / 1000.0 * sample_rate;
        Self {
            pan: SmoothedParam::fast(0.0, sample_rate),
            azimuth: SmoothedParam::standard(0.0, sample_rate),
            itd_l: InterpolatedDelay::new(max_itd_samples as usize + 8),
            itd_r: InterpolatedDelay::new(max_itd_samples as usize + 8),
            shadow_state: [0.0; 2],
            shadow_coeff: 1.0 - expf(-2.0 * PI * SHADOW_CUTOFF_HZ / sample_rate),
            max_itd_samples,
        }
    }

    /// Stereo pan, -1 (hard left) to 1 (hard right).
    pub fn set_pan(&mut self, pan: f32) {
        self.pan.set_target(pan.clamp(-1.0, 1.0));
    }

    /// Target pan.
    pub fn pan(&self) -> f32 {
        self.pan.target()
    }

    /// Source azimuth in degrees.
    pub fn set_azimuth(&mut self, degrees: f32) {
        self.azimuth.set_target(degrees.clamp(-180.0, 180.0));
    }

    /// Target azimuth in degrees.
    pub fn azimuth(&self) -> f32 {
        self.azimuth.target()
    }

    /// Stereo-input balance law.
    #[inline]
    fn balance(pan: f32, left: f32, right: f32) -> (f32, f32) {
        if pan <= 0.0 {
            let (g_l, g_r) = equal_power_pan(2.0 * (pan + 1.0) - 1.0);
            (left + right * g_l, right * g_r)
        } else {
            let (g_l, g_r) = equal_power_pan(2.0 * pan - 1.0);
            (left * g_l, right + left * g_r)
        }
    }

    #[inline]
    fn shadow(&mut self, ch: usize, input: f32, amount: f32) -> f32 {
        self.shadow_state[ch] =
            flush_denormal(self.shadow_state[ch] + self.shadow_coeff * (input - self.shadow_state[ch]));
        wet_dry_mix(input, self.shadow_state[ch], amount)
    }
}

impl Effect for Panner {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let pan = self.pan.advance();
        let azimuth = self.azimuth.advance();

        self.itd_l.write(left);
        self.itd_r.write(right);

        if pan == 0.0 && azimuth == 0.0 {
            self.shadow_state = [left, right];
            return (left, right);
        }

        let theta = azimuth * PI / 180.0;
        let lateral = sinf(theta);
        let rear = (1.0 - cosf(theta)) * 0.5;

        // Far ear hears the source later and darker.
        let itd = lateral.abs() * self.max_itd_samples;
        let (delay_l, delay_r) = if lateral > 0.0 { (itd, 0.0) } else { (0.0, itd) };
        let l = self.itd_l.read(delay_l);
        let r = self.itd_r.read(delay_r);

        let shadow = lateral.abs() * 0.5;
        let (shadow_l, shadow_r) = if lateral > 0.0 { (shadow, 0.0) } else { (0.0, shadow) };
        let l = self.shadow(0, l, shadow_l);
        let r = self.shadow(1, r, shadow_r);

        let (l, r) = Self::balance((pan + lateral).clamp(-1.0, 1.0), l, r);
        let gain = 1.0 - REAR_ATTENUATION * rear;
        (l * gain, r * gain)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let pan = self.pan.target();
        let azimuth = self.azimuth.target();
        *self = Self::new(sample_rate);
        self.pan.set_immediate(pan);
        self.azimuth.set_immediate(azimuth);
    }

    fn reset(&mut self) {
        self.itd_l.clear();
        self.itd_r.clear();
        self.shadow_state = [0.0; 2];
        self.pan.snap_to_target();
        self.azimuth.snap_to_target();
    }
}
