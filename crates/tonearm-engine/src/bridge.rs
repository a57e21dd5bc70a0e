//! Lock-free parameter hand-off from the control thread to the audio thread.
//!
//! The control side stores committed knob targets; the render callback
//! snapshots them once per buffer. Floats travel as their bit patterns in
//! `AtomicU32`s, so neither side ever blocks.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::params::{KNOB_COUNT, Knob};

/// A thread-safe atomic parameter using bit-cast f32.
///
/// Control thread writes, audio thread reads. No locks, no allocations.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicU32,
    min: f32,
    max: f32,
}

impl AtomicParam {
    /// Create with range and initial value.
    pub fn new(initial: f32, min: f32, max: f32) -> Self {
        Self {
            value: AtomicU32::new(initial.clamp(min, max).to_bits()),
            min,
            max,
        }
    }

    /// Store a value, clamped to range (control thread).
    #[inline]
    pub fn set(&self, v: f32) {
        let clamped = v.clamp(self.min, self.max);
        self.value.store(clamped.to_bits(), Ordering::Release);
    }

    /// Load the value (audio thread).
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }
}

/// Committed targets for every knob, plus a snap request counter.
///
/// Bumping the snap epoch tells the audio thread to drop running ramps and
/// jump straight to the stored targets, which is what `stop` and `load` do.
#[derive(Debug)]
pub struct ParamBridge {
    targets: [AtomicParam; KNOB_COUNT],
    snap_epoch: AtomicU32,
}

impl ParamBridge {
    /// Bridge holding `initial` values.
    pub fn new(initial: &[f32; KNOB_COUNT]) -> Self {
        Self {
            targets: std::array::from_fn(|i| {
                let (min, max) = Knob::ALL[i].range();
                AtomicParam::new(initial[i], min, max)
            }),
            snap_epoch: AtomicU32::new(0),
        }
    }

    /// Publish a committed target.
    #[inline]
    pub fn set_target(&self, knob: Knob, value: f32) {
        self.targets[knob.index()].set(value);
    }

    /// Last published target.
    #[inline]
    pub fn target(&self, knob: Knob) -> f32 {
        self.targets[knob.index()].get()
    }

    /// Every target, in [`Knob::ALL`] order.
    pub fn snapshot(&self) -> [f32; KNOB_COUNT] {
        std::array::from_fn(|i| self.targets[i].get())
    }

    /// Ask the audio thread to abort ramps.
    pub fn request_snap(&self) {
        self.snap_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of snap requests so far.
    #[inline]
    pub fn snap_epoch(&self) -> u32 {
        self.snap_epoch.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EffectParameterSet;

    #[test]
    fn test_atomic_param_clamps() {
        let p = AtomicParam::new(0.5, 0.0, 1.0);
        p.set(3.0);
        assert_eq!(p.get(), 1.0);
        p.set(-0.25);
        assert_eq!(p.get(), 0.0);
    }

    #[test]
    fn test_snapshot_reflects_targets() {
        let bridge = ParamBridge::new(EffectParameterSet::default().values());
        bridge.set_target(Knob::EqBand(2), 12.0);
        bridge.set_target(Knob::Speed, 9.0);
        let snap = bridge.snapshot();
        assert_eq!(snap[Knob::EqBand(2).index()], 12.0);
        assert_eq!(snap[Knob::Speed.index()], 2.0);
        assert_eq!(snap[Knob::Volume.index()], 80.0);
    }

    #[test]
    fn test_snap_epoch_counts() {
        let bridge = ParamBridge::new(EffectParameterSet::default().values());
        assert_eq!(bridge.snap_epoch(), 0);
        bridge.request_snap();
        bridge.request_snap();
        assert_eq!(bridge.snap_epoch(), 2);
    }
}
