//! Bounded undo/redo log of whole-document frame snapshots.

use std::collections::VecDeque;

use crate::Frame;

/// Maximum number of retained snapshots.
pub const MAX_HISTORY: usize = 50;

/// A deep copy of a document's frames, taken before a destructive edit.
pub type Snapshot = Vec<Frame>;

/// Linear undo history with a movable pointer.
///
/// `push` records the state *before* an edit. The stack does not know how to
/// install a snapshot; callers apply what `undo`/`redo` return.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<Snapshot>,
    /// Number of entries before the live state. Entries at and beyond this
    /// position are redo targets.
    pointer: usize,
    capacity: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    /// An empty history holding at most [`MAX_HISTORY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// An empty history with a custom cap (at least one entry).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            pointer: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a pre-edit snapshot, discarding any redo entries.
    pub fn push(&mut self, snapshot: &[Frame]) {
        self.entries.truncate(self.pointer);
        self.entries.push_back(snapshot.to_vec());
        self.evict();
        self.pointer = self.entries.len();
    }

    /// Step back one edit.
    ///
    /// `current` is the live state; it is kept as the redo target the first
    /// time `undo` is called after an edit. The tip is not counted against
    /// the cap. Returns `None` at the oldest entry.
    pub fn undo(&mut self, current: &[Frame]) -> Option<Snapshot> {
        if self.pointer == 0 {
            return None;
        }
        if self.pointer == self.entries.len() {
            self.entries.push_back(current.to_vec());
        }
        self.pointer -= 1;
        self.entries.get(self.pointer).cloned()
    }

    /// Step forward one edit. Returns `None` when nothing was undone.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if self.pointer + 1 >= self.entries.len() {
            return None;
        }
        self.pointer += 1;
        self.entries.get(self.pointer).cloned()
    }

    /// Whether `undo` would return a snapshot.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    /// Whether `redo` would return a snapshot.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    /// Number of stored snapshots, including a pending redo tip.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no snapshots are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all history, e.g. after loading another document.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pointer = 0;
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelGrid;

    fn state(bits: &str) -> Snapshot {
        vec![Frame {
            duration_ms: 100,
            grid: PixelGrid::from_bits(2, 1, bits),
        }]
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut history = HistoryStack::new();
        assert!(history.undo(&state("00")).is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut history = HistoryStack::new();
        let s0 = state("00");
        let s1 = state("10");
        let s2 = state("11");

        history.push(&s0);
        history.push(&s1);
        // live state is s2

        assert_eq!(history.undo(&s2), Some(s1.clone()));
        assert_eq!(history.redo(), Some(s2.clone()));
        assert_eq!(history.undo(&s2), Some(s1.clone()));
        assert_eq!(history.undo(&s1), Some(s0.clone()));
        assert!(history.undo(&s0).is_none());
        assert_eq!(history.redo(), Some(s1));
        assert_eq!(history.redo(), Some(s2));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_after_undo_truncates_redo() {
        let mut history = HistoryStack::new();
        history.push(&state("00"));
        history.push(&state("10"));
        history.undo(&state("11")).expect("undo");
        assert!(history.can_redo());

        history.push(&state("10"));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.undo(&state("01")), Some(state("10")));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryStack::with_capacity(3);
        for bits in ["00", "01", "10", "11"] {
            history.push(&state(bits));
        }
        assert_eq!(history.len(), 3);
        let live = state("00");
        assert_eq!(history.undo(&live), Some(state("11")));
        assert_eq!(history.undo(&state("11")), Some(state("10")));
        assert_eq!(history.undo(&state("10")), Some(state("01")));
        assert!(history.undo(&state("01")).is_none());
    }

    #[test]
    fn test_full_history_undoes_every_edit() {
        let mut history = HistoryStack::new();
        let snapshots: Vec<Snapshot> = (0..=MAX_HISTORY)
            .map(|i| {
                vec![Frame {
                    duration_ms: 100 + u32::try_from(i).expect("small"),
                    grid: PixelGrid::new(1, 1),
                }]
            })
            .collect();
        for snapshot in &snapshots[..MAX_HISTORY] {
            history.push(snapshot);
        }

        let mut live = snapshots[MAX_HISTORY].clone();
        let mut undone = 0;
        while let Some(previous) = history.undo(&live) {
            live = previous;
            undone += 1;
        }
        assert_eq!(undone, MAX_HISTORY);
        assert_eq!(live, snapshots[0]);

        let mut redone = 0;
        while let Some(next) = history.redo() {
            live = next;
            redone += 1;
        }
        assert_eq!(redone, MAX_HISTORY);
        assert_eq!(live, snapshots[MAX_HISTORY]);
    }

    #[test]
    fn test_default_cap_is_fifty() {
        let mut history = HistoryStack::new();
        for _ in 0..60 {
            history.push(&state("10"));
        }
        assert_eq!(history.len(), MAX_HISTORY);
    }
}
