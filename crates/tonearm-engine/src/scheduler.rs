//! Cancellable timed tasks keyed by voice.
//!
//! Crossfades, natural track ends and the post-gap start of the next track
//! are scheduled here against clock time. Nothing fires on its own:
//! [`Scheduler::take_due`] hands back whatever is due when the engine is
//! pumped, and the engine re-validates each task against the clock before
//! acting on it. Tearing down a voice cancels everything keyed to it.

use crate::voice::VoiceId;

/// Handle returned by [`Scheduler::schedule`].
pub type TaskId = u64;

/// What a scheduled task does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Start the incoming voice and both fade ramps.
    BeginCrossfade,
    /// Tear down the outgoing voice and promote the incoming one.
    FinishCrossfade,
    /// The voice has reached the end of its track.
    TrackEnd,
    /// Start a queued track after the inter-track gap.
    StartNext,
}

/// One pending task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTask {
    /// Task handle.
    pub id: TaskId,
    /// Voice the task belongs to.
    pub voice: VoiceId,
    /// Action.
    pub kind: TaskKind,
    /// Clock time at which the task becomes due.
    pub due: f64,
}

/// Pending tasks ordered by due time.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    next_id: TaskId,
}

impl Scheduler {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` for `voice` at clock time `due`.
    pub fn schedule(&mut self, voice: VoiceId, kind: TaskKind, due: f64) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        let due = if due.is_nan() { 0.0 } else { due };
        let at = self
            .tasks
            .iter()
            .position(|t| t.due > due)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(
            at,
            ScheduledTask {
                id,
                voice,
                kind,
                due,
            },
        );
        tracing::trace!(id, voice, ?kind, due, "task scheduled");
        id
    }

    /// Cancel one task. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Cancel every task keyed to `voice`. Returns how many were dropped.
    pub fn cancel_voice(&mut self, voice: VoiceId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.voice != voice);
        before - self.tasks.len()
    }

    /// Cancel tasks of one kind for `voice`.
    pub fn cancel_kind(&mut self, voice: VoiceId, kind: TaskKind) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.voice != voice || t.kind != kind);
        before - self.tasks.len()
    }

    /// Drop everything.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: f64) -> Vec<ScheduledTask> {
        let split = self
            .tasks
            .iter()
            .position(|t| t.due > now)
            .unwrap_or(self.tasks.len());
        self.tasks.drain(..split).collect()
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.first().map(|t| t.due)
    }

    /// Whether `voice` has a pending task of `kind`.
    pub fn has(&self, voice: VoiceId, kind: TaskKind) -> bool {
        self.tasks.iter().any(|t| t.voice == voice && t.kind == kind)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_due_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule(1, TaskKind::TrackEnd, 5.0);
        s.schedule(2, TaskKind::BeginCrossfade, 2.0);
        s.schedule(3, TaskKind::StartNext, 8.0);

        assert!(s.take_due(1.9).is_empty());
        let due = s.take_due(5.0);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].voice, 2);
        assert_eq!(due[1].voice, 1);
        assert_eq!(s.next_due(), Some(8.0));
    }

    #[test]
    fn test_equal_due_keeps_insertion_order() {
        let mut s = Scheduler::new();
        let a = s.schedule(1, TaskKind::FinishCrossfade, 3.0);
        let b = s.schedule(1, TaskKind::TrackEnd, 3.0);
        let due = s.take_due(3.0);
        assert_eq!(due.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_cancel_by_voice() {
        let mut s = Scheduler::new();
        s.schedule(1, TaskKind::BeginCrossfade, 1.0);
        s.schedule(1, TaskKind::TrackEnd, 2.0);
        s.schedule(2, TaskKind::TrackEnd, 3.0);
        assert_eq!(s.cancel_voice(1), 2);
        assert_eq!(s.cancel_voice(1), 0);
        assert_eq!(s.len(), 1);
        assert!(s.has(2, TaskKind::TrackEnd));
    }

    #[test]
    fn test_cancel_single_and_kind() {
        let mut s = Scheduler::new();
        let id = s.schedule(4, TaskKind::StartNext, 1.0);
        s.schedule(4, TaskKind::TrackEnd, 1.0);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert_eq!(s.cancel_kind(4, TaskKind::TrackEnd), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut s = Scheduler::new();
        for v in 0..4 {
            s.schedule(v, TaskKind::TrackEnd, v as f64);
        }
        s.cancel_all();
        assert!(s.is_empty());
        assert_eq!(s.next_due(), None);
    }
}
