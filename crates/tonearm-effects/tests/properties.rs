//! Property-based tests across every effect stage.
//!
//! Each stage is built with parameters drawn from its full range and must
//! keep its output finite and bounded, and go quiet after `reset`.

use std::sync::Arc;

use proptest::prelude::*;
use tonearm_core::Effect;
use tonearm_effects::{
    BassShelf, Chorus, Compressor, ConvolutionKernel, Convolver, Delay, Distortion, Flanger,
    GraphicEq, Limiter, Panner, Phaser, PitchShifter,
};

const SAMPLE_RATE: f32 = 48000.0;
const STAGE_COUNT: usize = 13;

fn lerp(t: f32, lo: f32, hi: f32) -> f32 {
    lo + t * (hi - lo)
}

/// Build stage `idx` with parameters taken from `p` (each in [0, 1]).
fn build_stage(idx: usize, p: &[f32; 16]) -> (&'static str, Box<dyn Effect + Send>) {
    match idx % STAGE_COUNT {
        0 => {
            let mut e = PitchShifter::new(SAMPLE_RATE);
            e.set_semitones(lerp(p[0], -12.0, 12.0));
            ("pitch", Box::new(e))
        }
        1 => {
            let mut e = GraphicEq::new(SAMPLE_RATE);
            for band in 0..10 {
                e.set_band_gain(band, lerp(p[band], -12.0, 12.0));
            }
            ("eq", Box::new(e))
        }
        2 => {
            let mut e = BassShelf::new(SAMPLE_RATE);
            e.set_gain_db(lerp(p[0], 0.0, 15.0));
            ("bass", Box::new(e))
        }
        3 => {
            let mut e = Distortion::new(SAMPLE_RATE);
            e.set_drive_db(lerp(p[0], 0.0, 30.0));
            e.set_tone_hz(lerp(p[1], 500.0, 10000.0));
            ("distortion", Box::new(e))
        }
        4 => {
            let mut e = Compressor::new(SAMPLE_RATE);
            e.set_threshold_db(lerp(p[0], -50.0, 0.0));
            ("compressor", Box::new(e))
        }
        5 => {
            let mut e = Panner::new(SAMPLE_RATE);
            e.set_pan(lerp(p[0], -1.0, 1.0));
            e.set_azimuth(lerp(p[1], -180.0, 180.0));
            ("panner", Box::new(e))
        }
        6 => ("limiter", Box::new(Limiter::new(SAMPLE_RATE))),
        7 => {
            let mut e = Delay::new(SAMPLE_RATE);
            e.set_delay_time_ms(lerp(p[0], 1.0, 1000.0));
            e.set_feedback(lerp(p[1], 0.0, 0.9));
            ("delay", Box::new(e))
        }
        8 => {
            let mut e = Chorus::new(SAMPLE_RATE);
            e.set_rate(lerp(p[0], 0.1, 5.0));
            e.set_depth(p[1]);
            ("chorus", Box::new(e))
        }
        9 => {
            let mut e = Flanger::new(SAMPLE_RATE);
            e.set_rate(lerp(p[0], 0.05, 5.0));
            e.set_depth(p[1]);
            e.set_feedback(lerp(p[2], 0.0, 0.9));
            ("flanger", Box::new(e))
        }
        10 => {
            let mut e = Phaser::new(SAMPLE_RATE);
            e.set_rate(lerp(p[0], 0.05, 5.0));
            e.set_depth(p[1]);
            e.set_feedback(lerp(p[2], 0.0, 0.9));
            ("phaser", Box::new(e))
        }
        11 => {
            let ir: Vec<f32> = (0..2048)
                .map(|i| libm::expf(-(i as f32) / lerp(p[0], 50.0, 800.0)) * 0.05)
                .collect();
            let kernel = Arc::new(ConvolutionKernel::mono(&ir, 256));
            ("convolver", Box::new(Convolver::new(kernel)))
        }
        _ => {
            let mut e = Distortion::new(SAMPLE_RATE);
            e.set_drive_db(0.0);
            ("clean distortion", Box::new(e))
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any stage, any parameters, any input in [-1, 1]: output stays finite
    /// and within a sane bound.
    #[test]
    fn stages_finite_and_bounded(
        input in prop::array::uniform32(-1.0f32..=1.0f32),
        params in prop::array::uniform16(0.0f32..=1.0f32),
        idx in 0usize..STAGE_COUNT,
    ) {
        let (name, mut stage) = build_stage(idx, &params);
        for _ in 0..8 {
            for &x in &input {
                let (l, r) = stage.process_stereo(x, -x);
                prop_assert!(l.is_finite() && r.is_finite(), "{name} produced ({l}, {r})");
                prop_assert!(l.abs() < 120.0 && r.abs() < 120.0, "{name} blew up: ({l}, {r})");
            }
        }
    }

    /// After reset and a settle period of silence the stage is quiet.
    #[test]
    fn stages_reset_to_silence(
        input in prop::array::uniform32(-1.0f32..=1.0f32),
        params in prop::array::uniform16(0.0f32..=1.0f32),
        idx in 0usize..STAGE_COUNT,
    ) {
        let (name, mut stage) = build_stage(idx, &params);
        for &x in &input {
            stage.process_stereo(x, x);
        }
        stage.reset();
        let mut last = (0.0f32, 0.0f32);
        for _ in 0..512 {
            last = stage.process_stereo(0.0, 0.0);
        }
        prop_assert!(last.0.abs() < 1e-3 && last.1.abs() < 1e-3, "{name} rang on: {last:?}");
    }

    /// The limiter never lets a sample past its ceiling.
    #[test]
    fn limiter_respects_ceiling(
        input in prop::collection::vec(-4.0f32..=4.0f32, 1..512),
        ceiling in -12.0f32..=0.0f32,
    ) {
        let mut limiter = Limiter::new(SAMPLE_RATE);
        limiter.set_ceiling_db(ceiling);
        let bound = libm::powf(10.0, limiter.ceiling_db() / 20.0) + 1e-5;
        for &x in &input {
            let (l, r) = limiter.process_stereo(x, x * 0.5);
            prop_assert!(l.abs() <= bound && r.abs() <= bound, "({l}, {r}) over {bound}");
        }
    }

    /// Neutral settings never colour the signal.
    #[test]
    fn neutral_stages_are_transparent(
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut eq = GraphicEq::new(SAMPLE_RATE);
        let mut pan = Panner::new(SAMPLE_RATE);
        let mut pitch = PitchShifter::new(SAMPLE_RATE);
        for &x in &input {
            let y = (x, x * 0.5);
            prop_assert_eq!(eq.process_stereo(y.0, y.1), y);
            prop_assert_eq!(pan.process_stereo(y.0, y.1), y);
            prop_assert_eq!(pitch.process_stereo(y.0, y.1), y);
        }
    }
}
