//! Property-based tests for tonearm-core DSP primitives.
//!
//! Filter stability across the EQ and shelf ranges the player exposes,
//! ramp monotonicity for knob automation, and delay line integrity.

use proptest::prelude::*;
use tonearm_core::{
    Biquad, InterpolatedDelay, LinearSmoothedParam, equal_power_pan, low_shelf_coefficients,
    peaking_eq_coefficients,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Peaking bands across the full +/-40 dB knob range stay finite.
    #[test]
    fn peaking_band_stability(
        freq in 31.0f32..16000.0f32,
        gain_db in -40.0f32..=40.0f32,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut biquad = Biquad::new();
        biquad.set_tuple(peaking_eq_coefficients(freq, 1.41, gain_db, 44100.0));
        for &sample in &input {
            let out = biquad.process(sample);
            prop_assert!(out.is_finite(), "freq={freq} gain={gain_db} produced {out}");
        }
    }

    /// Bass shelf is stable for every boost the bass knob can request.
    #[test]
    fn low_shelf_stability(
        gain_db in 0.0f32..=15.0f32,
        sample_rate in prop::sample::select(vec![22050.0f32, 44100.0, 48000.0, 96000.0]),
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut biquad = Biquad::new();
        biquad.set_tuple(low_shelf_coefficients(150.0, gain_db, sample_rate));
        for &sample in &input {
            prop_assert!(biquad.process(sample).is_finite());
        }
    }

    /// A retarget mid-ramp never jumps and moves monotonically to the new target.
    #[test]
    fn linear_ramp_retarget_is_monotonic(
        first in 0.0f32..=100.0f32,
        second in 0.0f32..=100.0f32,
        split in 1u32..1300,
    ) {
        let mut param = LinearSmoothedParam::with_config(50.0, 44100.0, 30.0);
        param.set_target(first);
        param.advance_by(split);
        let mut prev = param.get();
        param.set_target(second);
        let step_bound = (second - prev).abs() / 1323.0 + 1e-3;
        for _ in 0..1400 {
            let v = param.advance();
            prop_assert!((v - prev).abs() <= step_bound, "jump from {prev} to {v}");
            if second >= prev {
                prop_assert!(v >= prev - 1e-4);
            } else {
                prop_assert!(v <= prev + 1e-4);
            }
            prev = v;
        }
        prop_assert!((param.get() - second).abs() < 1e-4);
    }

    /// Pan law keeps constant power for every position.
    #[test]
    fn equal_power_is_constant_power(pan in -1.0f32..=1.0f32) {
        let (l, r) = equal_power_pan(pan);
        prop_assert!((l * l + r * r - 1.0).abs() < 1e-4);
    }

    /// Integer reads return exactly what was written.
    #[test]
    fn delay_line_integrity(
        values in prop::collection::vec(-1.0f32..=1.0f32, 1..64),
        delay in 0usize..60,
    ) {
        let mut line = InterpolatedDelay::new(128);
        for &v in &values {
            line.write(v);
        }
        if delay < values.len() {
            let expected = values[values.len() - 1 - delay];
            prop_assert_eq!(line.read(delay as f32), expected);
        }
    }
}
