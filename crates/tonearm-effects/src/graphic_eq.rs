//! Ten-band graphic equalizer.
//!
//! Octave-spaced RBJ peaking filters from 31 Hz to 16 kHz. Left and right
//! run separate filter banks so the channels never share history.
//!
//! While every band sits at 0 dB the whole bank is bypassed. Leaving bypass
//! starts from cleared filter state, which is silent because a flat bank
//! has just been passing the signal through.

use tonearm_core::{Biquad, Effect, SmoothedParam, peaking_eq_coefficients};

/// Number of bands.
pub const BAND_COUNT: usize = 10;

/// Band centre frequencies in Hz.
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    31.25, 62.5, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Q for every band, roughly one octave wide.
pub const BAND_Q: f32 = 1.41;

/// Gain limit in either direction.
pub const MAX_GAIN_DB: f32 = 40.0;

const COEFF_UPDATE_INTERVAL: u32 = 16;

/// Ten-band graphic EQ.
///
/// | Band | Centre |
/// |------|--------|
/// | 0 | 31 Hz |
/// | 1 | 62 Hz |
/// | 2 | 125 Hz |
/// | 3 | 250 Hz |
/// | 4 | 500 Hz |
/// | 5 | 1 kHz |
/// | 6 | 2 kHz |
/// | 7 | 4 kHz |
/// | 8 | 8 kHz |
/// | 9 | 16 kHz |
///
/// Gains are in dB, clamped to +/-40.
#[derive(Debug, Clone)]
pub struct GraphicEq {
    left: [Biquad; BAND_COUNT],
    right: [Biquad; BAND_COUNT],
    gains: [SmoothedParam; BAND_COUNT],
    /// Gain each band's coefficients were last computed for
    applied: [f32; BAND_COUNT],
    sample_rate: f32,
    coeff_update_counter: u32,
    bypassed: bool,
}

impl Default for GraphicEq {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl GraphicEq {
    /// Flat EQ.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            left: core::array::from_fn(|_| Biquad::new()),
            right: core::array::from_fn(|_| Biquad::new()),
            gains: core::array::from_fn(|_| SmoothedParam::standard(0.0, sample_rate)),
            applied: [0.0; BAND_COUNT],
            sample_rate,
            coeff_update_counter: 1,
            bypassed: true,
        }
    }

    /// Set a band's gain in dB. Out-of-range indices are ignored and return false.
    pub fn set_band_gain(&mut self, band: usize, gain_db: f32) -> bool {
        let Some(gain) = self.gains.get_mut(band) else {
            return false;
        };
        gain.set_target(gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB));
        true
    }

    /// Target gain of a band in dB, `None` for an invalid index.
    pub fn band_gain(&self, band: usize) -> Option<f32> {
        self.gains.get(band).map(SmoothedParam::target)
    }

    /// Set all bands at once.
    pub fn set_gains(&mut self, gains_db: &[f32; BAND_COUNT]) {
        for (band, &g) in gains_db.iter().enumerate() {
            self.set_band_gain(band, g);
        }
    }

    /// True while every band is flat and settled; the bank is skipped.
    pub fn is_neutral(&self) -> bool {
        self.gains
            .iter()
            .all(|g| g.target() == 0.0 && g.get().abs() < 1e-4)
    }

    /// Whether the last processed sample bypassed the bank.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn update_coefficients(&mut self, force: bool) {
        for band in 0..BAND_COUNT {
            let gain = self.gains[band].get();
            if force || (gain - self.applied[band]).abs() > 1e-4 {
                let coeffs =
                    peaking_eq_coefficients(BAND_FREQUENCIES[band], BAND_Q, gain, self.sample_rate);
                self.left[band].set_tuple(coeffs);
                self.right[band].set_tuple(coeffs);
                self.applied[band] = gain;
            }
        }
    }

    fn enter_bypass(&mut self) {
        self.bypassed = true;
        for gain in &mut self.gains {
            gain.snap_to_target();
        }
        for (l, r) in self.left.iter_mut().zip(self.right.iter_mut()) {
            l.clear();
            r.clear();
        }
    }
}

impl Effect for GraphicEq {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.is_neutral() {
            if !self.bypassed {
                self.enter_bypass();
            }
            return (left, right);
        }
        if self.bypassed {
            self.bypassed = false;
            self.update_coefficients(true);
        }

        for gain in &mut self.gains {
            gain.advance();
        }
        self.coeff_update_counter -= 1;
        if self.coeff_update_counter == 0 {
            self.coeff_update_counter = COEFF_UPDATE_INTERVAL;
            self.update_coefficients(false);
        }

        let mut l = left;
        let mut r = right;
        for band in 0..BAND_COUNT {
            l = self.left[band].process(l);
            r = self.right[band].process(r);
        }
        (l, r)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for gain in &mut self.gains {
            gain.set_sample_rate(sample_rate);
        }
        self.update_coefficients(true);
    }

    fn reset(&mut self) {
        for (l, r) in self.left.iter_mut().zip(self.right.iter_mut()) {
            l.clear();
            r.clear();
        }
        for gain in &mut self.gains {
            gain.snap_to_target();
        }
        self.update_coefficients(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| libm::sinf(2.0 * core::f32::consts::PI * freq * i as f32 / sr) * 0.1)
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        libm::sqrtf(x.iter().map(|s| s * s).sum::<f32>() / x.len() as f32)
    }

    #[test]
    fn test_flat_eq_is_bit_transparent() {
        let mut eq = GraphicEq::new(44100.0);
        for x in sine(440.0, 44100.0, 512) {
            assert_eq!(eq.process_stereo(x, -x), (x, -x));
        }
        assert!(eq.is_bypassed());
    }

    #[test]
    fn test_band_boost_raises_level_at_centre() {
        let sr = 44100.0;
        let mut eq = GraphicEq::new(sr);
        eq.set_band_gain(5, 12.0);
        let input = sine(1000.0, sr, 8820);
        let out: Vec<f32> = input.iter().map(|&x| eq.process(x)).collect();
        let ratio = rms(&out[4410..]) / rms(&input[4410..]);
        assert!((ratio - 3.98).abs() < 0.3, "expected ~+12 dB, got ratio {ratio}");
    }

    #[test]
    fn test_gain_clamped_and_readback() {
        let mut eq = GraphicEq::new(44100.0);
        assert!(eq.set_band_gain(0, 55.0));
        assert_eq!(eq.band_gain(0), Some(MAX_GAIN_DB));
        assert!(eq.set_band_gain(9, -55.0));
        assert_eq!(eq.band_gain(9), Some(-MAX_GAIN_DB));
    }

    #[test]
    fn test_invalid_band_rejected() {
        let mut eq = GraphicEq::new(44100.0);
        assert!(!eq.set_band_gain(10, 3.0));
        assert_eq!(eq.band_gain(10), None);
    }

    #[test]
    fn test_returns_to_bypass_after_flattening() {
        let mut eq = GraphicEq::new(44100.0);
        eq.set_band_gain(2, 6.0);
        for _ in 0..4410 {
            eq.process(0.1);
        }
        assert!(!eq.is_bypassed());
        eq.set_band_gain(2, 0.0);
        for _ in 0..44100 {
            eq.process(0.1);
        }
        assert!(eq.is_bypassed());
    }
}
