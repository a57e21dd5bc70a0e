//! Core Effect trait.
//!
//! Every stage the graph builder wires into a voice implements [`Effect`].
//! Stages are driven in stereo: the player always renders two channels,
//! mono sources are duplicated before they reach the first stage.
//!
//! - **Stereo first**: [`Effect::process_stereo`] is the method the graph calls.
//!   Effects that are naturally dual-mono only implement [`Effect::process`].
//! - **Object-safe**: the graph holds stages behind enum variants, but the
//!   trait stays usable as `dyn Effect` for tests and tools.
//! - **No allocations**: all methods run inside the render callback.

/// Core trait for all audio effects.
///
/// # Example
///
/// ```rust
/// use tonearm_core::Effect;
///
/// struct Trim {
///     gain: f32,
/// }
///
/// impl Effect for Trim {
///     fn process(&mut self, input: f32) -> f32 {
///         input * self.gain
///     }
///
///     fn set_sample_rate(&mut self, _sample_rate: f32) {}
///
///     fn reset(&mut self) {}
/// }
///
/// let mut trim = Trim { gain: 0.5 };
/// assert_eq!(trim.process_stereo(1.0, -1.0), (0.5, -0.5));
/// ```
pub trait Effect {
    /// Process a single mono sample.
    fn process(&mut self, input: f32) -> f32;

    /// Process one stereo frame.
    ///
    /// Default runs both channels through [`process`](Self::process), which is
    /// only correct for stateless effects. Stateful effects keep separate
    /// per-channel state and override this.
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.process(left), self.process(right))
    }

    /// Process a stereo block in place.
    ///
    /// `left` and `right` must be the same length.
    fn process_block_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "channel blocks must match");
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (ol, or) = self.process_stereo(*l, *r);
            *l = ol;
            *r = or;
        }
    }

    /// Update the sample rate and recompute rate-dependent coefficients.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state (delay lines, filter history) without touching parameters.
    fn reset(&mut self);

    /// Processing latency in samples. Zero for everything except block-based
    /// stages such as the partitioned convolver.
    fn latency_samples(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gain(f32);

    impl Effect for Gain {
        fn process(&mut self, input: f32) -> f32 {
            input * self.0
        }
        fn set_sample_rate(&mut self, _: f32) {}
        fn reset(&mut self) {}
    }

    struct Swap;

    impl Effect for Swap {
        fn process(&mut self, input: f32) -> f32 {
            input
        }
        fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
            (right, left)
        }
        fn set_sample_rate(&mut self, _: f32) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn test_default_stereo_is_dual_mono() {
        let mut g = Gain(2.0);
        assert_eq!(g.process_stereo(0.25, -0.5), (0.5, -1.0));
    }

    #[test]
    fn test_block_uses_stereo_override() {
        let mut swap = Swap;
        let mut left = [1.0, 2.0, 3.0];
        let mut right = [-1.0, -2.0, -3.0];
        swap.process_block_stereo(&mut left, &mut right);
        assert_eq!(left, [-1.0, -2.0, -3.0]);
        assert_eq!(right, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_default_latency_is_zero() {
        assert_eq!(Gain(1.0).latency_samples(), 0);
    }
}
