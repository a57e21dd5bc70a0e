//! Tonearm Effects - the stages a voice's signal graph is built from
//!
//! Main chain, in graph order:
//!
//! - [`PitchShifter`] - Two-head granular pitch shifter, independent of speed
//! - [`GraphicEq`] - Ten peaking bands, bypassed as a whole while flat
//! - [`BassShelf`] - Low shelf at 150 Hz
//! - [`Distortion`] - Tanh waveshaper with tone control
//! - [`Compressor`] - Soft-knee, stereo-linked compressor
//! - [`Panner`] - Stereo balance plus azimuth-based spatial placement
//! - [`Limiter`] - Zero-latency brickwall limiter
//!
//! Send returns (run fully wet, the graph mixes them back):
//!
//! - [`Delay`] - Feedback echo
//! - [`Chorus`], [`Flanger`], [`Phaser`] - Modulation flavours
//! - [`Convolver`] - Uniformly partitioned FFT convolution reverb (`std` only)
//!
//! ```rust
//! use tonearm_core::Effect;
//! use tonearm_effects::{BassShelf, GraphicEq};
//!
//! let mut eq = GraphicEq::new(44100.0);
//! eq.set_band_gain(3, 6.0);
//! let mut shelf = BassShelf::new(44100.0);
//! shelf.set_gain_db(9.0);
//!
//! let (l, r) = eq.process_stereo(0.1, 0.1);
//! let (l, r) = shelf.process_stereo(l, r);
//! assert!(l.is_finite() && r.is_finite());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod bass_shelf;
pub mod chorus;
pub mod compressor;
#[cfg(feature = "std")]
pub mod convolver;
pub mod delay;
pub mod distortion;
pub mod flanger;
pub mod graphic_eq;
pub mod limiter;
pub mod panner;
pub mod phaser;
pub mod pitch_shift;

pub use bass_shelf::BassShelf;
pub use chorus::Chorus;
pub use compressor::Compressor;
#[cfg(feature = "std")]
pub use convolver::{ConvolutionKernel, Convolver, DEFAULT_BLOCK_SIZE};
pub use delay::Delay;
pub use distortion::Distortion;
pub use flanger::Flanger;
pub use graphic_eq::{BAND_COUNT, BAND_FREQUENCIES, GraphicEq};
pub use limiter::Limiter;
pub use panner::Panner;
pub use phaser::Phaser;
pub use pitch_shift::PitchShifter;
