use std::collections::VecDeque;
use std::sync::Arc;

use crate::persist::SessionState;

/// Full snapshot of a document: encoded bitmap plus its serializable state.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub bitmap: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub state: SessionState,
}

impl HistoryEntry {
    /// Same pixels, filters and layers. The viewport is ignored since pan and zoom
    /// are not committed on their own.
    pub fn same_content(&self, other: &HistoryEntry) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.state.filters == other.state.filters
            && self.state.layers == other.state.layers
            && self.bitmap == other.bitmap
    }
}

/// Bounded linear undo/redo history.
///
/// The most recent commit is held as the baseline. Committing pushes the previous
/// baseline onto the undo stack, so undoing right after a commit returns to the state
/// before that edit. Undo and redo move exactly one entry between the stacks.
///
/// A document that changed since the last commit is dirty. Undoing from a dirty
/// document commits it first and then steps back to the baseline, so the last
/// committed state is never skipped. Redo is refused while dirty.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    baseline: Option<HistoryEntry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            baseline: None,
            limit: limit.max(1),
        }
    }

    /// Forgets everything and starts from `entry`.
    pub fn reset(&mut self, entry: HistoryEntry) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.baseline = Some(entry);
    }

    /// Records `entry` as the latest state. Returns whether an undo step was added;
    /// a commit identical to the baseline adds none. The redo stack is always cleared.
    pub fn commit(&mut self, entry: HistoryEntry) -> bool {
        self.redo_stack.clear();
        if self.baseline.as_ref() == Some(&entry) {
            return false;
        }
        let Some(previous) = self.baseline.replace(entry) else {
            return false;
        };
        self.undo_stack.push_back(previous);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        true
    }

    /// Whether `current` holds changes that were never committed.
    pub fn is_dirty(&self, current: &HistoryEntry) -> bool {
        self.baseline
            .as_ref()
            .is_some_and(|baseline| !baseline.same_content(current))
    }

    /// The entry `undo(current)` would restore.
    pub fn undo_target(&self, current: &HistoryEntry) -> Option<&HistoryEntry> {
        if self.is_dirty(current) {
            self.baseline.as_ref()
        } else {
            self.undo_stack.back()
        }
    }

    /// The entry `redo(current)` would restore.
    pub fn redo_target(&self, current: &HistoryEntry) -> Option<&HistoryEntry> {
        if self.is_dirty(current) {
            None
        } else {
            self.redo_stack.last()
        }
    }

    /// Pops the entry to restore, parking `current` on the redo stack.
    pub fn undo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        if self.is_dirty(&current) {
            self.commit(current.clone());
        }
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        self.baseline = Some(entry.clone());
        Some(entry)
    }

    /// Pops the entry to restore, parking `current` on the undo stack.
    pub fn redo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        if self.is_dirty(&current) {
            return None;
        }
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        self.baseline = Some(entry.clone());
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
