//! Overlap window between an outgoing and an incoming voice.

use crate::voice::VoiceId;

/// Clock time at which a crossfade of `window` seconds must begin so that
/// it ends together with a track that has `remaining` seconds left.
///
/// Never earlier than `now`.
pub fn crossfade_start(now: f64, remaining: f64, window: f64) -> f64 {
    now + (remaining - window).max(0.0)
}

/// A running crossfade.
///
/// Gains are linear in clock time and always sum to one:
///
/// ```rust
/// use tonearm_engine::CrossfadeSession;
///
/// let fade = CrossfadeSession::new(1, 2, 10.0, 2.0);
/// assert_eq!(fade.gains_at(11.0), (0.5, 0.5));
/// assert!(fade.is_complete(12.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeSession {
    outgoing: VoiceId,
    incoming: VoiceId,
    start: f64,
    length: f64,
}

impl CrossfadeSession {
    /// Crossfade from `outgoing` to `incoming` over `length` seconds.
    pub fn new(outgoing: VoiceId, incoming: VoiceId, start: f64, length: f64) -> Self {
        Self {
            outgoing,
            incoming,
            start,
            length: length.max(0.0),
        }
    }

    /// Voice fading out.
    pub fn outgoing(&self) -> VoiceId {
        self.outgoing
    }

    /// Voice fading in.
    pub fn incoming(&self) -> VoiceId {
        self.incoming
    }

    /// Clock time the fade began.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Fade length in seconds.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Clock time the fade completes.
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    /// Fraction complete at `now`, 0–1.
    pub fn progress(&self, now: f64) -> f64 {
        if self.length <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.length).clamp(0.0, 1.0)
    }

    /// `(outgoing, incoming)` gains at `now`.
    pub fn gains_at(&self, now: f64) -> (f32, f32) {
        let p = self.progress(now) as f32;
        (1.0 - p, p)
    }

    /// Whether the fade has run its course.
    pub fn is_complete(&self, now: f64) -> bool {
        now >= self.end()
    }

    /// Remaining fade time at `now`, in ms.
    pub fn remaining_ms(&self, now: f64) -> f32 {
        ((self.end() - now).max(0.0) * 1000.0) as f32
    }
}
