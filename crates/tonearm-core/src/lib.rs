//! Tonearm Core - DSP primitives for the player engine
//!
//! The building blocks every effect stage in `tonearm-effects` is made of.
//! Nothing in here allocates once constructed, so all of it is safe to call
//! from the real-time render callback.
//!
//! # Core Abstractions
//!
//! ## Effect System
//!
//! - [`Effect`] - Object-safe trait implemented by every stage in the signal graph
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing, used inside effects for coefficient changes
//! - [`LinearSmoothedParam`] - Linear ramps with a fixed window, used for knob automation
//!   and crossfade gains
//!
//! ## Filters and Delay Lines
//!
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook coefficients
//! - [`InterpolatedDelay`] - Variable-length delay with fractional reads
//!
//! ## Modulation & Dynamics
//!
//! - [`Lfo`] - Low-frequency oscillator
//! - [`EnvelopeFollower`] - Amplitude envelope detection
//!
//! ## Utilities
//!
//! - Level conversion: [`db_to_linear`], [`linear_to_db`]
//! - Pitch: [`semitones_to_ratio`]
//! - Panning: [`equal_power_pan`]
//! - Planar stereo render buffer: [`StereoSamples`]
//!
//! # no_std Support
//!
//! ```toml
//! [dependencies]
//! tonearm-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod lfo;
pub mod math;
pub mod param;
pub mod stereo_samples;

pub use biquad::{
    Biquad, highpass_coefficients, low_shelf_coefficients, lowpass_coefficients,
    peaking_eq_coefficients,
};
pub use delay::{InterpolatedDelay, Interpolation};
pub use effect::Effect;
pub use envelope::EnvelopeFollower;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    db_to_linear, equal_power_pan, flush_denormal, linear_to_db, ms_to_samples,
    semitones_to_ratio, soft_clip, wet_dry_mix,
};
pub use param::{LinearSmoothedParam, SmoothedParam};
pub use stereo_samples::StereoSamples;
