//! Per-execution traversal state.
//!
//! Traversal:
//! - Children are visited from the highest offset down, each subtree fully
//!   before its parent. A change at a higher offset never moves the stored
//!   offset of a lower sibling that has not been applied yet, so sibling
//!   offsets are never rewritten.
//! - After each apply the node's own length and every ancestor's length are
//!   moved by the delta, so an enclosing edit applied later covers the text
//!   its children produced.
//! - The inverse of each change is pushed at the head of the inverse
//!   sequence. Replaying that sequence front to back undoes the changes in
//!   reverse application order.
//!
//! A tracker attaches to the buffer when created and detaches in `Drop`, so
//! the registration is released on success, on error, and on unwind.

use crate::edit::{EditId, EditTree};
use crate::editor::MutationPolicy;
use crate::error::ExecutionError;
use crate::inverse::{InverseBatch, InverseEdit};
use crate::progress::{ProgressSink, SubProgress};
use crate::range::TextRange;
use core_text::{TextBuffer, TrackerId};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// The node currently being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveNode {
    Edit(EditId),
    Inverse(usize),
}

pub struct ApplyTracker<'b, B: TextBuffer> {
    id: TrackerId,
    buffer: &'b mut B,
    active: Option<ActiveNode>,
    applied: Vec<EditId>,
    inverse: VecDeque<InverseEdit>,
    changes: usize,
}

impl<'b, B: TextBuffer> ApplyTracker<'b, B> {
    pub fn attach(buffer: &'b mut B) -> Result<Self, ExecutionError> {
        let id = TrackerId::next();
        buffer.attach(id).map_err(ExecutionError::Attach)?;
        trace!(target: "edit.apply", tracker = %id, buffer_len = buffer.len(), "tracker_attached");
        Ok(Self {
            id,
            buffer,
            active: None,
            applied: Vec::new(),
            inverse: VecDeque::new(),
            changes: 0,
        })
    }

    pub fn id(&self) -> TrackerId {
        self.id
    }

    pub fn active(&self) -> Option<ActiveNode> {
        self.active
    }

    /// Nodes applied so far, in application order.
    pub fn applied(&self) -> &[EditId] {
        &self.applied
    }

    pub fn buffer(&self) -> &B {
        self.buffer
    }

    /// Walk `tree` from its root, applying every node the policy allows.
    pub fn execute(
        &mut self,
        tree: &mut EditTree,
        policy: &dyn MutationPolicy,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        let root = tree.root();
        self.execute_node(tree, root, policy, progress)
    }

    fn execute_node(
        &mut self,
        tree: &mut EditTree,
        id: EditId,
        policy: &dyn MutationPolicy,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        let children = tree.children(id).to_vec();
        progress.begin("", children.len() + 1);
        for child in children.into_iter().rev() {
            self.check_cancelled(progress)?;
            let mut sub = SubProgress::new(&mut *progress, 1);
            self.execute_node(tree, child, policy, &mut sub)?;
        }
        if policy.allows(tree, id) {
            self.apply_edit(tree, id)?;
        }
        progress.worked(1);
        Ok(())
    }

    fn apply_edit(&mut self, tree: &mut EditTree, id: EditId) -> Result<(), ExecutionError> {
        self.active = Some(ActiveNode::Edit(id));
        let result = tree.apply(id, &mut *self.buffer);
        self.active = None;
        let applied = result.map_err(|source| ExecutionError::Apply {
            edit: id,
            range: tree.range(id),
            source,
        })?;
        self.applied.push(id);
        if let Some(applied) = applied {
            let delta = applied.delta();
            tree.rebase(id, delta);
            trace!(target: "edit.apply", edit = %id, range = %applied.range, inserted = applied.inserted, delta, "edit_applied");
            self.record(applied.range, applied.inserted, applied.removed);
        }
        Ok(())
    }

    /// Apply one recorded inverse entry. Used by [`InverseBatch::replay`].
    pub(crate) fn apply_inverse(
        &mut self,
        index: usize,
        entry: &InverseEdit,
    ) -> Result<(), ExecutionError> {
        let range = entry.range();
        self.active = Some(ActiveNode::Inverse(index));
        let result = swap_text(&mut *self.buffer, range, entry.text());
        self.active = None;
        let removed = result.map_err(|source| ExecutionError::Replay {
            index,
            range,
            source,
        })?;
        trace!(target: "edit.apply", index, range = %range, inserted = entry.text().len(), "inverse_applied");
        self.record(range, entry.text().len(), removed);
        Ok(())
    }

    fn record(&mut self, range: TextRange, inserted: usize, removed: String) {
        self.inverse.push_front(InverseEdit::new(
            TextRange::new(range.offset(), inserted),
            removed,
        ));
        self.changes += 1;
    }

    pub(crate) fn check_cancelled(&self, progress: &dyn ProgressSink) -> Result<(), ExecutionError> {
        if progress.is_cancelled() {
            debug!(target: "edit.apply", tracker = %self.id, applied = self.changes, "cancelled");
            return Err(ExecutionError::Cancelled {
                applied: self.changes,
            });
        }
        Ok(())
    }

    /// Notify applied nodes in the reverse of their application order.
    pub fn settle(&mut self, tree: &mut EditTree, progress: &mut dyn ProgressSink) {
        progress.begin("", self.applied.len());
        for id in self.applied.iter().rev() {
            tree.settle(*id);
            progress.worked(1);
        }
    }

    /// Detach and hand over the inverse of everything applied.
    pub fn finish(mut self) -> InverseBatch {
        let edits = std::mem::take(&mut self.inverse);
        debug!(target: "edit.apply", tracker = %self.id, changes = self.changes, "tracker_finished");
        InverseBatch::from_edits(edits.into())
    }
}

fn swap_text<B: TextBuffer>(
    buffer: &mut B,
    range: TextRange,
    text: &str,
) -> Result<String, core_text::BufferError> {
    let removed = buffer.slice(range.offset(), range.length())?;
    buffer.replace(range.offset(), range.length(), text)?;
    Ok(removed)
}

impl<B: TextBuffer> Drop for ApplyTracker<'_, B> {
    fn drop(&mut self) {
        self.buffer.detach(self.id);
        trace!(target: "edit.apply", tracker = %self.id, "tracker_detached");
    }
}
