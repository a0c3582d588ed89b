//! # Edit History
//!
//! Bounded, snapshot-based undo/redo log.
//!
//! ## Design
//!
//! - The log holds full text snapshots plus a cursor index into them
//! - The entry at the cursor is always the current document state
//! - Recording after an undo discards every entry past the cursor
//! - Past capacity the oldest entry is evicted; the newest stays reachable
//! - Undo and redo saturate at the ends and never fail
//!
//! ## Example
//!
//! ```rust
//! use scribe_editor::{HistoryLog, Selection, Snapshot};
//!
//! let mut history = HistoryLog::new(Snapshot::new("", Selection::cursor(0)));
//! history.record(Snapshot::new("a", Selection::cursor(1)));
//! history.record(Snapshot::new("ab", Selection::cursor(2)));
//!
//! assert_eq!(history.undo().map(|s| s.text.as_str()), Some("a"));
//! assert_eq!(history.redo().map(|s| s.text.as_str()), Some("ab"));
//! assert!(history.redo().is_none());
//! ```

use crate::document::Selection;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

/// One recorded document state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub selection: Selection,
}

impl Snapshot {
    pub fn new(text: impl Into<String>, selection: Selection) -> Self {
        Self {
            text: text.into(),
            selection,
        }
    }
}

/// Undo/redo log for one editing session
#[derive(Debug, Clone)]
pub struct HistoryLog {
    /// Oldest first; never empty
    entries: VecDeque<Snapshot>,

    /// Index of the current state
    cursor: usize,

    /// Maximum number of entries, at least 1
    capacity: usize,
}

#[allow(clippy::len_without_is_empty)]
impl HistoryLog {
    /// Start a log with the default capacity
    pub fn new(initial: Snapshot) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    /// Start a log holding at most `capacity` entries (a capacity of 0 is
    /// treated as 1)
    pub fn with_capacity(initial: Snapshot, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity.min(64));
        entries.push_back(initial);
        Self {
            entries,
            cursor: 0,
            capacity,
        }
    }

    /// Append a snapshot after the cursor.
    ///
    /// Returns false when `snapshot` has the same text as the current entry;
    /// only the stored selection is refreshed in that case.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        let current = &mut self.entries[self.cursor];
        if current.text == snapshot.text {
            current.selection = snapshot.selection;
            return false;
        }

        // Drop the redo branch
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    /// Step back one entry, or `None` at the oldest entry
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward one entry, or `None` at the newest entry
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.cursor]
    }

    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    /// Number of entries, never zero: the log always holds the current state
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Forget everything and start over from `initial`
    pub fn reset(&mut self, initial: Snapshot) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.cursor = 0;
    }

    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}
