//! Ramped, debounced parameter automation.
//!
//! Each knob has an [`AutomationLane`]. A request opens a debounce window;
//! requests arriving inside the window only replace the pending target, and
//! when the window closes the latest target is committed as a linear
//! [`Ramp`] starting from wherever the previous ramp stands at that moment.
//! A drag that fires dozens of requests per second therefore reaches the
//! audio thread at most once per window, and the value never heads toward
//! a target that has already been superseded.
//!
//! Lanes are evaluated against the clock, so [`AutomationLane::value_at`]
//! gives the same answer whether or not [`AutomationLane::flush`] has run
//! yet.

/// Linear transition between two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// Value at `start_time`.
    pub start: f32,
    /// Value from `start_time + duration` on.
    pub target: f32,
    /// Clock time the ramp begins, in seconds.
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
}

impl Ramp {
    /// Ramp from `start` to `target`.
    pub fn new(start: f32, target: f32, start_time: f64, duration: f64) -> Self {
        Self {
            start,
            target,
            start_time,
            duration: duration.max(0.0),
        }
    }

    /// A ramp that is already at `value`.
    pub fn hold(value: f32, at: f64) -> Self {
        Self::new(value, value, at, 0.0)
    }

    /// Value at clock time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        if self.duration <= 0.0 || t >= self.end_time() {
            self.target
        } else if t <= self.start_time {
            self.start
        } else {
            let progress = ((t - self.start_time) / self.duration) as f32;
            self.start + (self.target - self.start) * progress
        }
    }

    /// Clock time the target is reached.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the ramp has finished by `t`.
    pub fn is_complete(&self, t: f64) -> bool {
        t >= self.end_time()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    target: f32,
    due: f64,
}

/// Automation state for one knob.
///
/// ```rust
/// use tonearm_engine::AutomationLane;
///
/// let mut lane = AutomationLane::new(0.0, 100.0, 25.0);
/// lane.request(1.0, 0.0);
/// lane.request(0.5, 0.01);
/// assert_eq!(lane.value_at(0.02), 0.0);
/// assert_eq!(lane.flush(0.03), Some(0.5));
/// assert_eq!(lane.value_at(0.125), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationLane {
    ramp: Ramp,
    window: f64,
    debounce: f64,
    pending: Option<Pending>,
}

impl AutomationLane {
    /// Lane resting at `initial`.
    pub fn new(initial: f32, window_ms: f32, debounce_ms: f32) -> Self {
        Self {
            ramp: Ramp::hold(initial, 0.0),
            window: f64::from(window_ms.max(0.0)) / 1000.0,
            debounce: f64::from(debounce_ms.max(0.0)) / 1000.0,
            pending: None,
        }
    }

    /// Ask for `target` at clock time `now`.
    ///
    /// Returns `true` when the target was committed immediately (no debounce).
    pub fn request(&mut self, target: f32, now: f64) -> bool {
        if self.debounce <= 0.0 {
            self.commit(target, now);
            return true;
        }
        match self.pending.as_mut() {
            Some(pending) if now < pending.due => pending.target = target,
            _ => {
                self.flush(now);
                self.pending = Some(Pending {
                    target,
                    due: now + self.debounce,
                });
            }
        }
        false
    }

    /// Commit the pending target if its window has closed by `now`.
    ///
    /// Returns the committed target.
    pub fn flush(&mut self, now: f64) -> Option<f32> {
        match self.pending {
            Some(pending) if pending.due <= now => {
                self.pending = None;
                self.commit(pending.target, pending.due);
                Some(pending.target)
            }
            _ => None,
        }
    }

    /// Value the knob stands at, at clock time `now`.
    pub fn value_at(&self, now: f64) -> f32 {
        match self.pending {
            Some(pending) if pending.due <= now => {
                let from = self.ramp.value_at(pending.due);
                Ramp::new(from, pending.target, pending.due, self.window).value_at(now)
            }
            _ => self.ramp.value_at(now),
        }
    }

    /// Latest requested target, committed or not.
    pub fn target(&self) -> f32 {
        self.pending.map_or(self.ramp.target, |p| p.target)
    }

    /// Target of the running ramp.
    pub fn committed_target(&self) -> f32 {
        self.ramp.target
    }

    /// Whether a request is waiting for its window to close.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The running ramp.
    pub fn ramp(&self) -> &Ramp {
        &self.ramp
    }

    /// Abort everything and rest at the latest target.
    pub fn snap(&mut self, now: f64) {
        let target = self.target();
        self.pending = None;
        self.ramp = Ramp::hold(target, now);
    }

    /// Change the ramp window for future commits.
    pub fn set_window_ms(&mut self, window_ms: f32) {
        self.window = f64::from(window_ms.max(0.0)) / 1000.0;
    }

    /// Ramp window in ms.
    pub fn window_ms(&self) -> f32 {
        (self.window * 1000.0) as f32
    }

    fn commit(&mut self, target: f32, at: f64) {
        let from = self.ramp.value_at(at);
        self.ramp = Ramp::new(from, target, at, self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_is_linear() {
        let ramp = Ramp::new(0.0, 10.0, 1.0, 2.0);
        assert_eq!(ramp.value_at(0.0), 0.0);
        assert_eq!(ramp.value_at(2.0), 5.0);
        assert_eq!(ramp.value_at(3.0), 10.0);
        assert!(ramp.is_complete(3.0));
    }

    #[test]
    fn test_zero_length_ramp_jumps() {
        let ramp = Ramp::new(1.0, 2.0, 0.0, 0.0);
        assert_eq!(ramp.value_at(0.0), 2.0);
    }

    #[test]
    fn test_requests_inside_window_coalesce() {
        let mut lane = AutomationLane::new(50.0, 30.0, 25.0);
        lane.request(80.0, 0.0);
        lane.request(20.0, 0.005);
        assert_eq!(lane.target(), 20.0);
        assert_eq!(lane.flush(0.02), None);
        assert_eq!(lane.flush(0.025), Some(20.0));
        assert!(!lane.is_pending());
        assert_eq!(lane.value_at(0.025 + 0.03), 20.0);
    }

    #[test]
    fn test_retarget_starts_from_current_value() {
        let mut lane = AutomationLane::new(0.0, 100.0, 0.0);
        lane.request(10.0, 0.0);
        assert!((lane.value_at(0.05) - 5.0).abs() < 1e-5);
        lane.request(0.0, 0.05);
        assert!((lane.value_at(0.05) - 5.0).abs() < 1e-5);
        assert!((lane.value_at(0.10) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_value_ignores_flush_timing() {
        let mut a = AutomationLane::new(0.0, 50.0, 25.0);
        let mut b = a.clone();
        a.request(1.0, 0.0);
        b.request(1.0, 0.0);
        b.flush(0.03);
        for t in [0.0, 0.02, 0.03, 0.05, 0.08] {
            assert_eq!(a.value_at(t), b.value_at(t), "t = {t}");
        }
    }

    #[test]
    fn test_late_request_commits_previous_window_first() {
        let mut lane = AutomationLane::new(0.0, 10.0, 25.0);
        lane.request(1.0, 0.0);
        lane.request(2.0, 0.1);
        assert_eq!(lane.committed_target(), 1.0);
        assert_eq!(lane.target(), 2.0);
    }

    #[test]
    fn test_snap_aborts_ramp() {
        let mut lane = AutomationLane::new(0.0, 1000.0, 25.0);
        lane.request(1.0, 0.0);
        lane.snap(0.001);
        assert_eq!(lane.value_at(0.001), 1.0);
        assert!(!lane.is_pending());
    }
}
