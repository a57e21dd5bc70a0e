//! Low-frequency oscillator for the modulation stages.

use core::f32::consts::PI;
use libm::sinf;

/// LFO waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sweep, chorus and flanger
    #[default]
    Sine,
    /// Linear sweep, phaser
    Triangle,
    /// Rising ramp in [-1, 1], drives the pitch shifter's read heads
    Saw,
}

/// Phase-accumulating oscillator producing values in [-1, 1].
///
/// ```rust
/// use tonearm_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(44100.0, 0.5);
/// lfo.set_waveform(LfoWaveform::Triangle);
/// let value = lfo.next();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Phase in [0, 1)
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create an LFO at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
        }
    }

    /// Set frequency in Hz. Negative values run the phase backwards.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Set waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Set phase in [0, 1). 0.25 is 90 degrees.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Next value in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * 2.0 * PI),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        } else if self.phase < 0.0 {
            self.phase += 1.0;
        }

        output
    }

    /// Next value mapped to [0, 1].
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next() + 1.0) * 0.5
    }

    /// Change sample rate keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.frequency();
        self.sample_rate = sample_rate;
        self.phase_inc = freq / sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_range() {
        let mut lfo = Lfo::new(1000.0, 3.0);
        for _ in 0..2000 {
            let v = lfo.next();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_saw_wraps() {
        let mut lfo = Lfo::new(100.0, 25.0);
        lfo.set_waveform(LfoWaveform::Saw);
        let first = lfo.next();
        assert_eq!(first, -1.0);
        for _ in 0..3 {
            lfo.next();
        }
        assert!((lfo.next() + 1.0).abs() < 1e-4, "saw restarts after one period");
    }

    #[test]
    fn test_negative_frequency_stays_in_range() {
        let mut lfo = Lfo::new(100.0, -7.0);
        for _ in 0..500 {
            lfo.next();
            assert!((0.0..1.0).contains(&lfo.phase()));
        }
    }

    #[test]
    fn test_sample_rate_change_keeps_frequency() {
        let mut lfo = Lfo::new(44100.0, 0.7);
        lfo.set_sample_rate(48000.0);
        assert!((lfo.frequency() - 0.7).abs() < 1e-5);
    }
}
