//! Synthetic stereo reverb kernels.
//!
//! For sample `i` at `t = i / sr`:
//!
//! ```text
//! early(t) = sum of 3-7 random impulses at t < 0.1 s, each scaled by exp(-10 t)
//! tail(t)  = noise(-1..1) * exp(-3 t / decay) * brightness
//! mod(t)   = 1 + 0.05 sin(2π 0.7 t) + 0.03 sin(2π 1.3 t)
//! left     = (early + tail) * mod
//! right    = 0.95 * left + noise(-1..1) * 0.02 * exp(-3 t / decay) * brightness
//! ```
//!
//! The kernel is then scaled to unit energy so the reverb return sits near
//! unity gain whatever the room. Noise comes from a seeded `StdRng`, so a
//! room, sample rate and seed always give the same kernel.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tonearm_config::RoomPreset;
use tonearm_effects::{ConvolutionKernel, DEFAULT_BLOCK_SIZE};

const EARLY_WINDOW_SECS: f32 = 0.1;
const EARLY_DECAY: f32 = 10.0;
const CHANNEL_CORRELATION: f32 = 0.95;
const DECORRELATION_NOISE: f32 = 0.02;

/// A synthesized stereo kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Synthesize the kernel for `room` at `sample_rate`.
    pub fn synthesize(room: &RoomPreset, sample_rate: u32, seed: u64) -> Self {
        let sr = sample_rate.max(1) as f32;
        let frames = ((sr * room.size_secs).round() as usize).max(1);
        let decay = room.decay_secs.max(1e-3);
        let mut rng = StdRng::seed_from_u64(seed);

        let early_len = ((EARLY_WINDOW_SECS * sr) as usize).clamp(1, frames);
        let mut early = vec![0.0f32; early_len];
        let reflections = rng.gen_range(3..=7);
        for _ in 0..reflections {
            let index = rng.gen_range(0..early_len);
            let t = index as f32 / sr;
            early[index] += rng.gen_range(-1.0f32..=1.0) * (-EARLY_DECAY * t).exp();
        }

        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for i in 0..frames {
            let t = i as f32 / sr;
            let envelope = (-3.0 * t / decay).exp() * room.brightness;
            let tail = rng.gen_range(-1.0f32..=1.0) * envelope;
            let modulation =
                1.0 + 0.05 * (2.0 * PI * 0.7 * t).sin() + 0.03 * (2.0 * PI * 1.3 * t).sin();
            let l = (early.get(i).copied().unwrap_or(0.0) + tail) * modulation;
            let noise = rng.gen_range(-1.0f32..=1.0) * DECORRELATION_NOISE * envelope;
            left.push(l);
            right.push(CHANNEL_CORRELATION * l + noise);
        }

        let mut ir = Self {
            left,
            right,
            sample_rate,
        };
        ir.normalize();
        tracing::debug!(
            room = room.name,
            sample_rate,
            frames,
            seed,
            "synthesized impulse response"
        );
        ir
    }

    fn normalize(&mut self) {
        let energy = self.energy();
        if energy > 0.0 {
            let scale = 1.0 / energy.sqrt();
            for s in self.left.iter_mut().chain(self.right.iter_mut()) {
                *s *= scale;
            }
        }
    }

    /// Mean per-channel energy (sum of squares).
    pub fn energy(&self) -> f32 {
        let sum = |c: &[f32]| c.iter().map(|s| s * s).sum::<f32>();
        (sum(&self.left) + sum(&self.right)) * 0.5
    }

    /// Kernel length in frames.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True for a zero-length kernel.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Left channel.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel.
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Sample rate the kernel was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Partition and transform for the convolver.
    pub fn to_kernel(&self, block: usize) -> ConvolutionKernel {
        ConvolutionKernel::new(&self.left, &self.right, block)
    }
}

/// Transformed kernels per room and sample rate.
///
/// Building a kernel means synthesizing seconds of noise and running a few
/// hundred FFTs, so every graph and every export shares one `Arc`.
#[derive(Debug)]
pub struct KernelCache {
    seed: u64,
    entries: HashMap<(&'static str, u32), Arc<ConvolutionKernel>>,
}

impl KernelCache {
    /// Empty cache using `seed` for every room.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            entries: HashMap::new(),
        }
    }

    /// Kernel for `room` at `sample_rate`, built on first use.
    pub fn get(&mut self, room: &RoomPreset, sample_rate: u32) -> Arc<ConvolutionKernel> {
        let seed = self.seed;
        Arc::clone(self.entries.entry((room.name, sample_rate)).or_insert_with(|| {
            Arc::new(ImpulseResponse::synthesize(room, sample_rate, seed).to_kernel(DEFAULT_BLOCK_SIZE))
        }))
    }

    /// Number of cached kernels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been built yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonearm_config::find_room;

    fn small() -> RoomPreset {
        find_room("small").unwrap()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|s| s * s).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_length_follows_room_size() {
        let ir = ImpulseResponse::synthesize(&small(), 8000, 1);
        assert_eq!(ir.len(), 6400);
        assert_eq!(ir.right().len(), 6400);
        assert_eq!(ir.sample_rate(), 8000);
    }

    #[test]
    fn test_same_seed_same_kernel() {
        let a = ImpulseResponse::synthesize(&small(), 8000, 42);
        let b = ImpulseResponse::synthesize(&small(), 8000, 42);
        let c = ImpulseResponse::synthesize(&small(), 8000, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unit_energy() {
        let ir = ImpulseResponse::synthesize(&find_room("hall").unwrap(), 8000, 7);
        assert!((ir.energy() - 1.0).abs() < 1e-3, "energy {}", ir.energy());
    }

    #[test]
    fn test_tail_decays() {
        let ir = ImpulseResponse::synthesize(&small(), 16000, 3);
        let quarter = ir.len() / 4;
        let head = rms(&ir.left()[..quarter]);
        let end = rms(&ir.left()[3 * quarter..]);
        assert!(head > end * 4.0, "head {head}, end {end}");
    }

    #[test]
    fn test_channels_strongly_correlated() {
        let ir = ImpulseResponse::synthesize(&small(), 16000, 9);
        let dot: f32 = ir.left().iter().zip(ir.right()).map(|(l, r)| l * r).sum();
        let el: f32 = ir.left().iter().map(|s| s * s).sum();
        let er: f32 = ir.right().iter().map(|s| s * s).sum();
        let correlation = dot / (el * er).sqrt();
        assert!(correlation > 0.9, "correlation {correlation}");
        let ratio = (er / el).sqrt();
        assert!((ratio - 0.95).abs() < 0.05, "ratio {ratio}");
    }

    #[test]
    fn test_cache_reuses_kernels() {
        let mut cache = KernelCache::new(1);
        let a = cache.get(&small(), 8000);
        let b = cache.get(&small(), 8000);
        assert!(Arc::ptr_eq(&a, &b));
        cache.get(&small(), 16000);
        assert_eq!(cache.len(), 2);
    }
}
