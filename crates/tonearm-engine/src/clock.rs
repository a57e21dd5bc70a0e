//! Wall clock and the playback transport anchored to it.
//!
//! The transport never counts samples. Position is derived from a clock
//! timestamp and a logical offset:
//!
//! ```text
//! position = offset + (now - anchor) * rate     while playing
//! position = offset                             while paused
//! ```
//!
//! Every operation that changes how position evolves (rate change, seek,
//! pause) folds the elapsed time into `offset` and re-anchors at `now`, so
//! the formula above stays valid without ever rewriting history.

use std::time::Instant;

use parking_lot::Mutex;

/// Monotonic time source in seconds.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary fixed origin.
    fn now(&self) -> f64;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock with its origin at the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
///
/// ```rust
/// use tonearm_engine::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.advance(1.5);
/// assert_eq!(clock.now(), 1.5);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `secs`. Negative values are ignored.
    pub fn advance(&self, secs: f64) {
        if secs > 0.0 {
            *self.now.lock() += secs;
        }
    }

    /// Jump to `secs` if it is later than the current time.
    pub fn set(&self, secs: f64) {
        let mut now = self.now.lock();
        if secs > *now {
            *now = secs;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Playback position model for one loaded track.
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    duration: f64,
    offset: f64,
    anchor: f64,
    rate: f64,
    playing: bool,
}

impl Transport {
    /// Paused at zero, rate 1.
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            offset: 0.0,
            anchor: 0.0,
            rate: 1.0,
            playing: false,
        }
    }

    /// Track length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether position is advancing.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current playback rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Logical position in seconds, clamped to the track length.
    pub fn position(&self, now: f64) -> f64 {
        if self.playing {
            let elapsed = (now - self.anchor).max(0.0);
            (self.offset + elapsed * self.rate).min(self.duration)
        } else {
            self.offset
        }
    }

    /// Resume from the current offset.
    pub fn play(&mut self, now: f64) {
        if !self.playing {
            self.anchor = now;
            self.playing = true;
        }
    }

    /// Start playing from `offset` seconds.
    pub fn play_from(&mut self, offset: f64, now: f64) {
        self.offset = self.clamp(offset);
        self.anchor = now;
        self.playing = true;
    }

    /// Freeze the position.
    pub fn pause(&mut self, now: f64) {
        if self.playing {
            self.offset = self.position(now);
            self.playing = false;
        }
    }

    /// Jump to `target`, clamped to `[0, duration]`. Keeps the play state.
    ///
    /// Returns the position actually set.
    pub fn seek(&mut self, target: f64, now: f64) -> f64 {
        let target = self.clamp(target);
        self.offset = target;
        self.anchor = now;
        target
    }

    /// Change rate, keeping position continuous.
    pub fn set_rate(&mut self, rate: f64, now: f64) {
        if self.playing {
            self.offset = self.position(now);
            self.anchor = now;
        }
        self.rate = rate.max(f64::EPSILON);
    }

    /// Back to zero, paused.
    pub fn stop(&mut self) {
        self.offset = 0.0;
        self.playing = false;
    }

    /// Wall-clock seconds until the natural end at the current rate.
    pub fn remaining(&self, now: f64) -> f64 {
        (self.duration - self.position(now)).max(0.0) / self.rate
    }

    /// Whether the position has reached the end.
    pub fn is_finished(&self, now: f64) -> bool {
        self.position(now) >= self.duration
    }

    fn clamp(&self, secs: f64) -> f64 {
        if secs.is_nan() {
            0.0
        } else {
            secs.clamp(0.0, self.duration)
        }
    }
}
