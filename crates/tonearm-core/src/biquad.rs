//! Biquad (bi-quadratic) filter.
//!
//! Second-order IIR section plus the RBJ Audio EQ Cookbook coefficient
//! formulas the equalizer, bass shelf and limiter sidechain need.
//! Every coefficient function returns `(b0, b1, b2, a0, a1, a2)`; pass the
//! tuple straight to [`Biquad::set_coefficients`], which normalises by `a0`.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf, sqrtf};

/// Direct Form I biquad:
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Passthrough filter (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Set coefficients, normalising by `a0`.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Set coefficients from a cookbook tuple.
    pub fn set_tuple(&mut self, coeffs: (f32, f32, f32, f32, f32, f32)) {
        let (b0, b1, b2, a0, a1, a2) = coeffs;
        self.set_coefficients(b0, b1, b2, a0, a1, a2);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = crate::math::flush_denormal(output);

        output
    }

    /// Clear filter history without touching coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let nyquist_safe = frequency.clamp(1.0, sample_rate * 0.49);
    let omega = 2.0 * PI * nyquist_safe / sample_rate;
    (cosf(omega), sinf(omega) / (2.0 * q))
}

/// Low-pass coefficients.
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b1 = 1.0 - cos_omega;
    (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// High-pass coefficients.
pub fn highpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b0 = (1.0 + cos_omega) / 2.0;
    (b0, -(1.0 + cos_omega), b0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Peaking EQ coefficients. Boosts or cuts `gain_db` around `frequency`.
pub fn peaking_eq_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);

    (
        1.0 + alpha * a,
        -2.0 * cos_omega,
        1.0 - alpha * a,
        1.0 + alpha / a,
        -2.0 * cos_omega,
        1.0 - alpha / a,
    )
}

/// Low-shelf coefficients with shelf slope S = 1 (Q ≈ 0.707).
pub fn low_shelf_coefficients(
    frequency: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, alpha) = omega_terms(frequency, core::f32::consts::FRAC_1_SQRT_2, sample_rate);
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    let b0 = a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha);
    let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega);
    let b2 = a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha);
    let a0 = (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha;
    let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega);
    let a2 = (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha;

    (b0, b1, b2, a0, a1, a2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_gain(coeffs: (f32, f32, f32, f32, f32, f32)) -> f32 {
        let mut bq = Biquad::new();
        bq.set_tuple(coeffs);
        let mut out = 0.0;
        for _ in 0..20000 {
            out = bq.process(1.0);
        }
        out
    }

    #[test]
    fn test_passthrough_by_default() {
        let mut bq = Biquad::new();
        assert_eq!(bq.process(0.3), 0.3);
        assert_eq!(bq.process(-0.7), -0.7);
    }

    #[test]
    fn test_zero_db_peaking_is_identity() {
        let mut bq = Biquad::new();
        bq.set_tuple(peaking_eq_coefficients(1000.0, 1.41, 0.0, 44100.0));
        for i in 0..256 {
            let x = libm::sinf(i as f32 * 0.1);
            assert!((bq.process(x) - x).abs() < 1e-5);
        }
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let g = dc_gain(lowpass_coefficients(1000.0, 0.707, 48000.0));
        assert!((g - 1.0).abs() < 1e-3, "dc gain {g}");
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let g = dc_gain(highpass_coefficients(1000.0, 0.707, 48000.0));
        assert!(g.abs() < 1e-3, "dc gain {g}");
    }

    #[test]
    fn test_low_shelf_boosts_dc_by_gain() {
        let g = dc_gain(low_shelf_coefficients(150.0, 12.0, 44100.0));
        let expected = powf(10.0, 12.0 / 20.0);
        assert!((g - expected).abs() / expected < 0.01, "dc gain {g}");
    }

    #[test]
    fn test_clear_resets_history() {
        let mut bq = Biquad::new();
        bq.set_tuple(lowpass_coefficients(500.0, 0.707, 44100.0));
        for _ in 0..100 {
            bq.process(1.0);
        }
        bq.clear();
        let first = bq.process(0.0);
        assert_eq!(first, 0.0);
    }
}
