//! Ordered track list with repeat and shuffle.
//!
//! In shuffle mode the upcoming order is a pre-drawn bag, so the next track
//! is known (and can be preloaded for a crossfade) before the current one
//! ends. Going back walks a history of the tracks actually played rather
//! than drawing another random track.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand::seq::SliceRandom;

/// What happens at the end of the list or of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Stop after the last track.
    #[default]
    Off,
    /// Wrap around to the start.
    All,
    /// Replay the current track when it ends naturally.
    One,
}

/// Track list plus play position.
#[derive(Debug, Clone)]
pub struct TrackQueue<T> {
    tracks: Vec<T>,
    current: Option<usize>,
    repeat: RepeatMode,
    shuffle: bool,
    /// Upcoming shuffle order; the next track is at the end.
    bag: Vec<usize>,
    history: Vec<usize>,
    rng: StdRng,
}

impl<T> TrackQueue<T> {
    /// Empty queue. `seed` drives the shuffle order.
    pub fn new(seed: u64) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            repeat: RepeatMode::Off,
            shuffle: false,
            bag: Vec::new(),
            history: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Queue holding `tracks`, nothing selected yet.
    pub fn from_tracks(tracks: Vec<T>, seed: u64) -> Self {
        let mut queue = Self::new(seed);
        queue.tracks = tracks;
        queue
    }

    /// Append a track.
    pub fn push(&mut self, track: T) {
        self.tracks.push(track);
        if self.shuffle {
            let index = self.tracks.len() - 1;
            let at = self.rng.gen_range(0..=self.bag.len());
            self.bag.insert(at, index);
        }
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// All tracks in list order.
    pub fn tracks(&self) -> &[T] {
        &self.tracks
    }

    /// The selected track.
    pub fn current(&self) -> Option<&T> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Index of the selected track.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Repeat mode.
    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Set the repeat mode.
    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    /// Whether shuffle is on.
    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    /// Turn shuffle on or off. Turning it on draws a fresh order.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
        self.bag.clear();
        if shuffle {
            self.refill_bag();
        }
    }

    /// Jump to `index`. The track being left goes on the history.
    pub fn select(&mut self, index: usize) -> Option<&T> {
        if index >= self.tracks.len() {
            return None;
        }
        self.move_to(index);
        self.bag.retain(|&i| i != index);
        self.current()
    }

    /// Track that [`next_track`](Self::next_track) would move to.
    pub fn peek_next(&mut self) -> Option<&T> {
        let index = self.next_index()?;
        self.tracks.get(index)
    }

    /// Skip forward. Repeat-one does not hold a skip.
    pub fn next_track(&mut self) -> Option<&T> {
        let index = self.next_index()?;
        if self.shuffle {
            self.bag.pop();
        }
        self.move_to(index);
        self.current()
    }

    /// Advance after the current track finished on its own.
    pub fn on_track_end(&mut self) -> Option<&T> {
        if self.repeat == RepeatMode::One && self.current.is_some() {
            return self.current();
        }
        self.next_track()
    }

    /// Go back.
    ///
    /// Shuffle mode returns the previously played track from the history;
    /// the track being left is put back at the front of the upcoming order.
    /// List order steps to the preceding index, wrapping under repeat-all.
    pub fn previous_track(&mut self) -> Option<&T> {
        if self.shuffle {
            let index = self.history.pop()?;
            if let Some(cur) = self.current {
                self.bag.push(cur);
            }
            self.current = Some(index);
            return self.current();
        }

        let cur = self.current?;
        let index = match cur.checked_sub(1) {
            Some(i) => i,
            None if self.repeat == RepeatMode::All => self.tracks.len().checked_sub(1)?,
            None => return None,
        };
        self.move_to(index);
        self.current()
    }

    /// Drop every track and all position state.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
        self.bag.clear();
        self.history.clear();
    }

    fn next_index(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.shuffle {
            if self.bag.is_empty() && (self.repeat == RepeatMode::All || self.current.is_none()) {
                self.refill_bag();
            }
            return self.bag.last().copied();
        }
        match self.current {
            None => Some(0),
            Some(cur) if cur + 1 < self.tracks.len() => Some(cur + 1),
            Some(_) if self.repeat == RepeatMode::All => Some(0),
            Some(_) => None,
        }
    }

    fn move_to(&mut self, index: usize) {
        if let Some(cur) = self.current {
            self.history.push(cur);
        }
        self.current = Some(index);
    }

    fn refill_bag(&mut self) {
        self.bag = (0..self.tracks.len())
            .filter(|&i| Some(i) != self.current || self.tracks.len() == 1)
            .collect();
        self.bag.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(n: usize) -> TrackQueue<usize> {
        TrackQueue::from_tracks((0..n).collect(), 42)
    }

    #[test]
    fn test_in_order_then_stop() {
        let mut q = queue(3);
        assert_eq!(q.next_track(), Some(&0));
        assert_eq!(q.next_track(), Some(&1));
        assert_eq!(q.next_track(), Some(&2));
        assert_eq!(q.next_track(), None);
        assert_eq!(q.current(), Some(&2));
    }

    #[test]
    fn test_repeat_all_wraps() {
        let mut q = queue(2);
        q.set_repeat(RepeatMode::All);
        q.next_track();
        q.next_track();
        assert_eq!(q.peek_next(), Some(&0));
        assert_eq!(q.next_track(), Some(&0));
        assert_eq!(q.previous_track(), Some(&1));
    }

    #[test]
    fn test_repeat_one_holds_natural_end_only() {
        let mut q = queue(3);
        q.set_repeat(RepeatMode::One);
        q.select(1);
        assert_eq!(q.on_track_end(), Some(&1));
        assert_eq!(q.next_track(), Some(&2));
    }

    #[test]
    fn test_previous_at_start_without_repeat() {
        let mut q = queue(3);
        q.next_track();
        assert_eq!(q.previous_track(), None);
        assert_eq!(q.current(), Some(&0));
    }

    #[test]
    fn test_shuffle_plays_each_track_once() {
        let mut q = queue(8);
        q.set_shuffle(true);
        let mut seen = Vec::new();
        while let Some(&t) = q.next_track() {
            seen.push(t);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_peek_matches_next() {
        let mut q = queue(6);
        q.set_shuffle(true);
        for _ in 0..6 {
            let peeked = q.peek_next().copied();
            assert_eq!(q.next_track().copied(), peeked);
        }
    }

    #[test]
    fn test_shuffle_previous_walks_history() {
        let mut q = queue(10);
        q.set_shuffle(true);
        let played: Vec<usize> = (0..4).filter_map(|_| q.next_track().copied()).collect();
        assert_eq!(q.previous_track(), Some(&played[2]));
        assert_eq!(q.previous_track(), Some(&played[1]));
        assert_eq!(q.previous_track(), Some(&played[0]));
        assert_eq!(q.previous_track(), None);
        // Forward again retraces the same path.
        assert_eq!(q.next_track(), Some(&played[1]));
        assert_eq!(q.next_track(), Some(&played[2]));
        assert_eq!(q.next_track(), Some(&played[3]));
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let order = |seed| {
            let mut q = TrackQueue::from_tracks((0..12).collect::<Vec<usize>>(), seed);
            q.set_shuffle(true);
            (0..12).filter_map(|_| q.next_track().copied()).collect::<Vec<_>>()
        };
        assert_eq!(order(7), order(7));
    }

    #[test]
    fn test_select_removes_from_bag() {
        let mut q = queue(4);
        q.set_shuffle(true);
        q.select(2);
        let rest: Vec<usize> = (0..3).filter_map(|_| q.next_track().copied()).collect();
        assert!(!rest.contains(&2));
        assert_eq!(q.next_track(), None);
    }

    #[test]
    fn test_empty_queue() {
        let mut q: TrackQueue<usize> = TrackQueue::new(1);
        assert!(q.is_empty());
        assert_eq!(q.next_track(), None);
        assert_eq!(q.previous_track(), None);
        q.push(9);
        assert_eq!(q.next_track(), Some(&9));
    }
}
