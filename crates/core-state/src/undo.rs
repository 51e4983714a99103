use core_edit::InverseBatch;
use tracing::trace;

/// Default number of entries retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// One undoable step: the inverse produced by executing a labelled batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub label: String,
    pub inverse: InverseBatch,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>, inverse: InverseBatch) -> Self {
        Self {
            label: label.into(),
            inverse,
        }
    }
}

/// Undo and redo stacks of inverse batches.
///
/// Each entry on the undo stack, replayed, returns the buffer to the state
/// before its batch ran; replaying produces the matching redo entry. The
/// engine only stores entries, [`EditSession`](crate::EditSession) does the
/// replaying.
pub struct UndoEngine {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max: usize,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self::with_max(UNDO_HISTORY_MAX)
    }

    /// `max` below one is treated as one.
    pub fn with_max(max: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max: max.max(1),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.redo_stack.last()
    }

    /// Record a freshly executed batch. Empty inverses are not recorded and
    /// leave the redo stack alone.
    pub fn record(&mut self, entry: HistoryEntry) {
        if entry.inverse.is_empty() {
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), label = %entry.label, "noop_batch_not_recorded");
            return;
        }
        self.push_undo(entry);
        self.redo_stack.clear();
        trace!(target: "state.undo", "redo_stack_cleared_on_new_edit");
    }

    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), label = %entry.label, "undo_pop");
        Some(entry)
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), label = %entry.label, "redo_pop");
        Some(entry)
    }

    /// Push onto the undo stack without touching redo (used after a redo and
    /// to restore an entry whose replay was rejected).
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "push_undo");
        if self.undo_stack.len() > self.max {
            let _ = self.undo_stack.remove(0);
            trace!(target: "state.undo", max = self.max, "undo_stack_trimmed");
        }
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), "redo_push_from_undo");
    }

    /// Forget everything, e.g. after a replay failed part way and the stored
    /// offsets no longer describe the buffer.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        trace!(target: "state.undo", "history_cleared");
    }
}
