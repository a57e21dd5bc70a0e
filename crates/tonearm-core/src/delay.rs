//! Circular-buffer delay line with fractional reads.
//!
//! | Stage | Delay range | Modulated |
//! |-------|-------------|-----------|
//! | Flanger | 1-10 ms | yes |
//! | Chorus | 10-30 ms | yes |
//! | Pitch shifter | 5-50 ms | yes (sawtooth sweep) |
//! | Echo | 100-1000 ms | no |

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Interpolation used for fractional delay reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear interpolation between two samples
    #[default]
    Linear,
    /// 4-point cubic, for modulated delays where linear adds audible dulling
    Cubic,
}

/// Heap-allocated delay line. Allocates once on construction, never in
/// [`read`](Self::read) or [`write`](Self::write).
///
/// ```rust
/// use tonearm_core::InterpolatedDelay;
///
/// let mut delay = InterpolatedDelay::from_time(44100.0, 0.05);
/// delay.write(1.0);
/// assert_eq!(delay.read(0.0), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    interpolation: Interpolation,
}

impl InterpolatedDelay {
    /// Delay line holding `max_delay_samples` samples (minimum 4).
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(4)],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Delay line sized for `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds) as usize + 1)
    }

    /// Select the fractional read method.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// Read the sample written `delay_samples` writes ago (0 = most recent).
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay_clamped = delay_samples.clamp(0.0, (len - 3) as f32);

        let delay_int = delay_clamped as usize;
        let frac = delay_clamped - delay_int as f32;

        let newest = (self.write_pos + len - 1) % len;
        let p1 = (newest + len - delay_int) % len;
        let p2 = (p1 + len - 1) % len;

        match self.interpolation {
            Interpolation::Linear => {
                let a = self.buffer[p1];
                let b = self.buffer[p2];
                a + (b - a) * frac
            }
            Interpolation::Cubic => {
                let y0 = self.buffer[(p1 + 1) % len];
                let y1 = self.buffer[p1];
                let y2 = self.buffer[p2];
                let y3 = self.buffer[(p2 + len - 1) % len];

                let t = frac;
                let c0 = y3 - y2 - y0 + y1;
                let c1 = y0 - y1 - c0;
                let c2 = y2 - y0;
                ((c0 * t + c1) * t + c2) * t + y1
            }
        }
    }

    /// Write a sample and advance.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_delay() {
        let mut d = InterpolatedDelay::new(16);
        for i in 0..8 {
            d.write(i as f32);
        }
        assert_eq!(d.read(0.0), 7.0);
        assert_eq!(d.read(3.0), 4.0);
    }

    #[test]
    fn test_fractional_delay_linear() {
        let mut d = InterpolatedDelay::new(16);
        d.write(0.0);
        d.write(1.0);
        assert!((d.read(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cubic_passes_through_samples() {
        let mut d = InterpolatedDelay::new(32);
        d.set_interpolation(Interpolation::Cubic);
        for i in 0..10 {
            d.write(i as f32 * 0.1);
        }
        assert!((d.read(2.0) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_clear() {
        let mut d = InterpolatedDelay::new(8);
        d.write(1.0);
        d.clear();
        assert_eq!(d.read(0.0), 0.0);
    }
}
