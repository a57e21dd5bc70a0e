//! Parameter smoothing for zipper-free changes.
//!
//! Two flavours:
//!
//! - [`SmoothedParam`]: exponential (one-pole lowpass). Effects use it
//!   internally so coefficient updates never step.
//! - [`LinearSmoothedParam`]: constant-rate ramp over a fixed window. The
//!   engine uses it for every user-facing knob and for crossfade gains, where
//!   the ramp must finish at a predictable time.
//!
//! ```rust
//! use tonearm_core::LinearSmoothedParam;
//!
//! let mut volume = LinearSmoothedParam::with_config(0.8, 48000.0, 30.0);
//! volume.set_target(0.2);
//!
//! // 30 ms at 48 kHz
//! volume.advance_by(1440);
//! assert_eq!(volume.get(), 0.2);
//! ```

use libm::expf;

/// A parameter with one-pole exponential smoothing.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// Smoothing coefficient (1 = instant)
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a parameter with smoothing disabled (instant changes).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a smoothed parameter with full configuration.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// 10 ms smoothing, the default for gains and filter gains.
    pub fn standard(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 10.0)
    }

    /// 5 ms smoothing for pan and drive.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 5.0)
    }

    /// 50 ms smoothing for delay times, where faster changes pitch-bend audibly.
    pub fn slow(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 50.0)
    }

    /// Set the value to smooth towards.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and snap to it.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update sample rate and recalculate the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Set the time constant in milliseconds.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        // y[n] = y[n-1] + coeff * (target - y[n-1])
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once within 1e-6 of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// `coeff = 1 - exp(-1 / (tau * sample_rate))`, tau in seconds.
    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// A parameter that ramps linearly to its target over a fixed window.
///
/// Every new target restarts the ramp from the value the parameter currently
/// stands at, so a retarget mid-ramp never jumps and the full window is
/// always used for the remaining distance.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    current: f32,
    target: f32,
    /// Increment per sample (signed)
    increment: f32,
    samples_remaining: u32,
    sample_rate: f32,
    transition_time_ms: f32,
}

impl LinearSmoothedParam {
    /// Create with a 10 ms window at 44.1 kHz.
    pub fn new(initial: f32) -> Self {
        Self::with_config(initial, 44100.0, 10.0)
    }

    /// Create with full configuration.
    pub fn with_config(initial: f32, sample_rate: f32, transition_time_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            sample_rate,
            transition_time_ms,
        }
    }

    /// Ramp to `target` over the configured window.
    pub fn set_target(&mut self, target: f32) {
        self.ramp_to(target, self.transition_time_ms);
    }

    /// Ramp to `target` over `time_ms`, starting from the current value.
    ///
    /// A zero-length window snaps immediately.
    pub fn ramp_to(&mut self, target: f32, time_ms: f32) {
        self.target = target;
        let samples = (time_ms.max(0.0) / 1000.0 * self.sample_rate) as u32;
        if samples == 0 || (target - self.current).abs() < 1e-9 {
            self.snap_to_target();
        } else {
            self.increment = (target - self.current) / samples as f32;
            self.samples_remaining = samples;
        }
    }

    /// Set value immediately.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Update sample rate. Takes effect on the next retarget.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Set the default window used by [`set_target`](Self::set_target).
    pub fn set_transition_time_ms(&mut self, time_ms: f32) {
        self.transition_time_ms = time_ms;
    }

    /// Advance one sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Advance `samples` at once, as the graph does once per block.
    pub fn advance_by(&mut self, samples: u32) -> f32 {
        if samples >= self.samples_remaining {
            self.snap_to_target();
        } else {
            self.current += self.increment * samples as f32;
            self.samples_remaining -= samples;
        }
        self.current
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Samples left in the running ramp.
    #[inline]
    pub fn samples_remaining(&self) -> u32 {
        self.samples_remaining
    }

    /// True when no ramp is running.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }

    /// Abort the ramp and jump to the target.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for LinearSmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothed_param_instant_when_no_smoothing() {
        let mut param = SmoothedParam::new(1.0);
        param.set_target(0.5);
        assert!((param.advance() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn smoothed_param_converges() {
        let mut param = SmoothedParam::standard(0.0, 48000.0);
        param.set_target(1.0);
        for _ in 0..(48000 * 50 / 1000) {
            param.advance();
        }
        assert!((param.get() - 1.0).abs() < 0.01, "got {}", param.get());
    }

    #[test]
    fn linear_reaches_target_exactly() {
        let mut param = LinearSmoothedParam::with_config(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        for _ in 0..480 {
            param.advance();
        }
        assert_eq!(param.get(), 1.0);
        assert!(param.is_settled());
    }

    #[test]
    fn linear_retarget_starts_from_current_value() {
        let mut param = LinearSmoothedParam::with_config(0.0, 1000.0, 100.0);
        param.set_target(80.0);
        param.advance_by(50);
        let mid = param.get();
        assert!((mid - 40.0).abs() < 1e-3);

        param.set_target(20.0);
        let next = param.advance();
        assert!(next < mid, "must head towards 20, got {next}");
        assert!((next - mid).abs() < 1.0, "no jump allowed");
        assert_eq!(param.samples_remaining(), 99);
    }

    #[test]
    fn linear_advance_by_matches_per_sample() {
        let mut a = LinearSmoothedParam::with_config(0.0, 44100.0, 30.0);
        let mut b = a.clone();
        a.set_target(-6.0);
        b.set_target(-6.0);
        for _ in 0..300 {
            a.advance();
        }
        b.advance_by(300);
        assert!((a.get() - b.get()).abs() < 1e-4);
    }

    #[test]
    fn linear_zero_window_snaps() {
        let mut param = LinearSmoothedParam::new(1.0);
        param.ramp_to(0.0, 0.0);
        assert_eq!(param.get(), 0.0);
        assert!(param.is_settled());
    }
}
