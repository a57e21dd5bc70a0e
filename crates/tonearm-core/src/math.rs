//! Mathematical utility functions for DSP.
//!
//! Allocation-free, `no_std` helpers shared by every stage.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`]
//!
//! # Player Helpers
//!
//! | Function | Used by |
//! |----------|---------|
//! | [`semitones_to_ratio`] | pitch shifter |
//! | [`equal_power_pan`] | stereo/spatial panner |
//! | [`soft_clip`] | distortion |
//! | [`wet_dry_mix`] | modulation effects |

use core::f32::consts::FRAC_PI_4;
use libm::{cosf, expf, logf, sinf, tanhf};

/// Convert decibels to linear gain.
///
/// ```rust
/// use tonearm_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Inputs at or below 1e-10 floor at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Frequency ratio for a pitch offset in semitones (`2^(s/12)`).
///
/// ```rust
/// use tonearm_core::semitones_to_ratio;
///
/// assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-5);
/// assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-5);
/// ```
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_2 / 12.0;
    expf(semitones * FACTOR)
}

/// Equal-power pan law. `pan` in [-1, 1]; returns `(left_gain, right_gain)`.
///
/// Centre gives -3 dB on both sides so perceived loudness stays constant
/// as the source moves.
#[inline]
pub fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (cosf(angle), sinf(angle))
}

/// Smooth tanh saturation.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Replace values below 1e-20 with zero to keep feedback paths out of the
/// subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// `dry + (wet - dry) * mix`
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}
