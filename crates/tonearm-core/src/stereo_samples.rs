//! Planar stereo buffer used by the offline renderer and WAV export.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A pair of equal-length channel buffers.
///
/// ```rust
/// use tonearm_core::StereoSamples;
///
/// let samples = StereoSamples::new(vec![1.0; 4], vec![0.5; 4]);
/// assert_eq!(samples.len(), 4);
/// assert_eq!(samples.to_mono()[0], 0.75);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoSamples {
    /// Left channel samples.
    pub left: Vec<f32>,
    /// Right channel samples.
    pub right: Vec<f32>,
}

impl StereoSamples {
    /// Create from left and right channels.
    pub fn new(left: Vec<f32>, right: Vec<f32>) -> Self {
        debug_assert_eq!(left.len(), right.len(), "Channels must have same length");
        Self { left, right }
    }

    /// Silent buffer of `frames` frames.
    pub fn silence(frames: usize) -> Self {
        Self {
            left: alloc_zeroed(frames),
            right: alloc_zeroed(frames),
        }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True when there are no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Average both channels.
    pub fn to_mono(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(self.right.iter())
            .map(|(l, r)| (l + r) * 0.5)
            .collect()
    }
}

fn alloc_zeroed(frames: usize) -> Vec<f32> {
    let mut v = Vec::with_capacity(frames);
    v.resize(frames, 0.0);
    v
}
