//! Batch orchestration over a single buffer.
//!
//! State machine:
//! - `Empty` → `Forward` on the first `add`, → `Inverse` on `add_inverse`.
//! - Forward and inverse batches never mix; staging one while the other is
//!   held fails with [`EditError::StagingConflict`]. A second inverse replaces
//!   the first.
//! - `validate` caches its status until the next `add`, `add_inverse` or
//!   `clear`.
//! - `execute` refuses an `Error` status (staged state is kept), otherwise
//!   takes the staged work, runs it, and returns to `Empty` whatever the
//!   outcome.
//!
//! Progress weighting is fixed: four fifths for execution, one fifth for the
//! settle notifications.

use crate::batch::EditBatch;
use crate::edit::{EditId, EditTree};
use crate::error::{EditError, StagedKind, ValidationError};
use crate::inverse::InverseBatch;
use crate::progress::{NoProgress, ProgressSink, SubProgress};
use crate::status::{Severity, ValidationStatus};
use crate::tracker::ApplyTracker;
use core_text::TextBuffer;
use tracing::{debug, info, warn};

const EXECUTE_UNITS: usize = 4;
const SETTLE_UNITS: usize = 1;

/// Decides whether a node may mutate the buffer. Nodes that are refused are
/// still walked.
pub trait MutationPolicy {
    fn allows(&self, _tree: &EditTree, _id: EditId) -> bool {
        true
    }
}

/// Every node mutates.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl MutationPolicy for AllowAll {}

/// Walks the whole tree without touching the buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralDryRun;

impl MutationPolicy for StructuralDryRun {
    fn allows(&self, _tree: &EditTree, _id: EditId) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Severity reported for a staged batch that changes nothing.
    pub noop_severity: Severity,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            noop_severity: Severity::Warning,
        }
    }
}

#[derive(Debug, Default)]
enum Staged {
    #[default]
    Empty,
    Forward(EditBatch),
    Inverse(InverseBatch),
}

impl Staged {
    fn kind(&self) -> Option<StagedKind> {
        match self {
            Staged::Empty => None,
            Staged::Forward(_) => Some(StagedKind::Forward),
            Staged::Inverse(_) => Some(StagedKind::Inverse),
        }
    }
}

pub struct BatchEditor<'b, B: TextBuffer, P: MutationPolicy = AllowAll> {
    buffer: &'b mut B,
    policy: P,
    options: ValidationOptions,
    staged: Staged,
    check: Option<ValidationStatus>,
}

impl<'b, B: TextBuffer> BatchEditor<'b, B> {
    pub fn new(buffer: &'b mut B) -> Self {
        Self::with_policy(buffer, AllowAll)
    }
}

impl<'b, B: TextBuffer, P: MutationPolicy> BatchEditor<'b, B, P> {
    pub fn with_policy(buffer: &'b mut B, policy: P) -> Self {
        Self {
            buffer,
            policy,
            options: ValidationOptions::default(),
            staged: Staged::Empty,
            check: None,
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self.check = None;
        self
    }

    pub fn buffer(&self) -> &B {
        self.buffer
    }

    /// Direct buffer access. Mutating through this while a batch is staged
    /// invalidates the offsets that batch was connected against.
    pub fn buffer_mut(&mut self) -> &mut B {
        self.buffer
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn staged(&self) -> Option<StagedKind> {
        self.staged.kind()
    }

    /// Connect `tree` to the buffer and stage it under the batch root.
    ///
    /// Ownership moves into the editor. On error nothing is staged and any
    /// batch staged earlier is unchanged.
    pub fn add(&mut self, tree: impl Into<EditTree>) -> Result<EditId, EditError> {
        if let Staged::Inverse(_) = self.staged {
            return Err(self.conflict(StagedKind::Forward));
        }
        let mut tree = tree.into();
        let range = tree.range(tree.root());
        tree.connect(&*self.buffer)?;
        let id = if let Staged::Forward(batch) = &mut self.staged {
            batch.add(tree)?
        } else {
            let mut batch = EditBatch::new(self.buffer.len());
            let id = batch.add(tree)?;
            self.staged = Staged::Forward(batch);
            id
        };
        self.check = None;
        debug!(target: "edit.editor", edit = %id, range = %range, "edit_staged");
        Ok(id)
    }

    /// Stage a previously produced inverse for replay.
    ///
    /// Fails only while a forward batch is staged; an inverse staged earlier
    /// is replaced.
    pub fn add_inverse(&mut self, inverse: InverseBatch) -> Result<(), EditError> {
        if let Staged::Forward(_) = self.staged {
            return Err(self.conflict(StagedKind::Inverse));
        }
        let replaced = matches!(self.staged, Staged::Inverse(_));
        debug!(target: "edit.editor", entries = inverse.len(), replaced, "inverse_staged");
        self.staged = Staged::Inverse(inverse);
        self.check = None;
        Ok(())
    }

    fn conflict(&self, incoming: StagedKind) -> EditError {
        let staged = self.staged.kind().unwrap_or(incoming);
        warn!(target: "edit.editor", %staged, %incoming, "staging_conflict");
        EditError::StagingConflict { staged, incoming }
    }

    /// Check the staged work against the current buffer length.
    pub fn validate(&mut self) -> ValidationStatus {
        if let Some(status) = &self.check {
            return status.clone();
        }
        let buffer_len = self.buffer.len();
        let status = match &self.staged {
            Staged::Empty => ValidationStatus::ok("nothing staged"),
            Staged::Forward(batch) => match batch.validate(buffer_len) {
                Err(err) => ValidationStatus::error(err),
                Ok(()) if !batch.has_effect() => self.noop_status(),
                Ok(()) => ValidationStatus::ok("batch is valid"),
            },
            Staged::Inverse(inverse) => match inverse.validate_against(buffer_len) {
                Err(err) => ValidationStatus::error(err),
                Ok(()) if inverse.is_empty() => self.noop_status(),
                Ok(()) => ValidationStatus::ok("inverse is valid"),
            },
        };
        debug!(target: "edit.validate", severity = %status.severity(), buffer_len, message = status.message(), "validated");
        self.check = Some(status.clone());
        status
    }

    fn noop_status(&self) -> ValidationStatus {
        match self.options.noop_severity {
            Severity::Ok => ValidationStatus::ok("batch contains no text changes"),
            Severity::Warning => ValidationStatus::warning("batch contains no text changes"),
            Severity::Error => ValidationStatus::error(ValidationError::NoEffect),
        }
    }

    /// Run the staged work and return its inverse.
    ///
    /// A failure part way through leaves earlier edits applied; the partial
    /// inverse is dropped.
    pub fn execute(
        &mut self,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<InverseBatch, EditError> {
        let status = self.validate();
        if let Some(err) = status.validation_error() {
            warn!(target: "edit.editor", %err, "execute_rejected");
            return Err(err.clone().into());
        }
        let mut noop = NoProgress;
        let progress: &mut dyn ProgressSink = match progress {
            Some(progress) => progress,
            None => &mut noop,
        };
        let staged = std::mem::take(&mut self.staged);
        self.check = None;
        let result = match staged {
            Staged::Empty => Ok(InverseBatch::default()),
            Staged::Forward(batch) => self.execute_forward(batch, progress),
            Staged::Inverse(inverse) => self.execute_inverse(inverse, progress),
        };
        match &result {
            Ok(inverse) => {
                info!(target: "edit.editor", entries = inverse.len(), net_delta = inverse.net_delta(), buffer_len = self.buffer.len(), "batch_executed")
            }
            Err(err) => warn!(target: "edit.editor", %err, "batch_failed"),
        }
        result
    }

    fn execute_forward(
        &mut self,
        mut batch: EditBatch,
        progress: &mut dyn ProgressSink,
    ) -> Result<InverseBatch, EditError> {
        progress.begin("apply edits", EXECUTE_UNITS + SETTLE_UNITS);
        let mut tracker = ApplyTracker::attach(&mut *self.buffer)?;
        tracker.execute(
            batch.tree_mut(),
            &self.policy,
            &mut SubProgress::new(&mut *progress, EXECUTE_UNITS),
        )?;
        tracker.settle(
            batch.tree_mut(),
            &mut SubProgress::new(&mut *progress, SETTLE_UNITS),
        );
        Ok(tracker.finish())
    }

    fn execute_inverse(
        &mut self,
        inverse: InverseBatch,
        progress: &mut dyn ProgressSink,
    ) -> Result<InverseBatch, EditError> {
        progress.begin("replay inverse", EXECUTE_UNITS + SETTLE_UNITS);
        let mut tracker = ApplyTracker::attach(&mut *self.buffer)?;
        inverse.replay(
            &mut tracker,
            &mut SubProgress::new(&mut *progress, EXECUTE_UNITS),
        )?;
        inverse.settled(&mut SubProgress::new(&mut *progress, SETTLE_UNITS));
        Ok(tracker.finish())
    }

    /// Drop staged work and the cached status without executing.
    pub fn clear(&mut self) {
        self.staged = Staged::Empty;
        self.check = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::TextEdit;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_editor_executes_to_empty_inverse() {
        let mut buf = Buffer::from_str("t", "abc");
        let mut editor = BatchEditor::new(&mut buf);
        assert!(editor.validate().is_ok());
        let inverse = editor.execute(None).unwrap();
        assert!(inverse.is_empty());
    }

    #[test]
    fn forward_then_inverse_conflict() {
        let mut buf = Buffer::from_str("t", "abc");
        let mut editor = BatchEditor::new(&mut buf);
        editor.add(TextEdit::insert(0, ">")).unwrap();
        let err = editor.add_inverse(InverseBatch::default()).unwrap_err();
        assert_eq!(
            err,
            EditError::StagingConflict {
                staged: StagedKind::Forward,
                incoming: StagedKind::Inverse
            }
        );
        assert_eq!(editor.staged(), Some(StagedKind::Forward));
    }

    #[test]
    fn second_inverse_replaces_first() {
        let mut buf = Buffer::from_str("t", "abc");
        let first = {
            let mut editor = BatchEditor::new(&mut buf);
            editor.add(TextEdit::insert(3, "!")).unwrap();
            editor.execute(None).unwrap()
        };
        let mut editor = BatchEditor::new(&mut buf);
        editor.add_inverse(InverseBatch::default()).unwrap();
        assert!(!editor.validate().is_ok());
        editor.add_inverse(first).unwrap();
        assert_eq!(editor.staged(), Some(StagedKind::Inverse));
        assert!(editor.validate().is_ok());
        editor.execute(None).unwrap();
        assert_eq!(buf.text(), "abc");
    }

    #[test]
    fn inverse_then_forward_conflict() {
        let mut buf = Buffer::from_str("t", "abc");
        let mut editor = BatchEditor::new(&mut buf);
        editor.add_inverse(InverseBatch::default()).unwrap();
        assert!(matches!(
            editor.add(TextEdit::insert(0, ">")),
            Err(EditError::StagingConflict {
                staged: StagedKind::Inverse,
                incoming: StagedKind::Forward
            })
        ));
    }

    #[test]
    fn cache_invalidated_by_add_and_clear() {
        let mut buf = Buffer::from_str("t", "0123456789");
        let mut editor = BatchEditor::new(&mut buf);
        editor.add(TextEdit::insert(2, "x")).unwrap();
        assert!(editor.validate().is_ok());
        editor.add(TextEdit::replace(8, 5, "y")).unwrap();
        assert!(editor.validate().is_error());
        editor.clear();
        assert_eq!(editor.staged(), None);
        assert!(editor.validate().is_ok());
    }

    #[test]
    fn noop_severity_is_configurable() {
        let mut buf = Buffer::from_str("t", "abc");
        let mut editor = BatchEditor::new(&mut buf);
        editor.add(TextEdit::group(0, 2)).unwrap();
        assert_eq!(editor.validate().severity(), Severity::Warning);

        let mut editor = editor.with_options(ValidationOptions {
            noop_severity: Severity::Error,
        });
        assert_eq!(
            editor.validate().validation_error(),
            Some(&ValidationError::NoEffect)
        );
        assert!(matches!(
            editor.execute(None),
            Err(EditError::Validation(ValidationError::NoEffect))
        ));
    }

    #[test]
    fn warning_status_still_executes() {
        let mut buf = Buffer::from_str("t", "abc");
        let mut editor = BatchEditor::new(&mut buf);
        editor.add(TextEdit::group(0, 3)).unwrap();
        assert_eq!(editor.validate().severity(), Severity::Warning);
        let inverse = editor.execute(None).unwrap();
        assert!(inverse.is_empty());
        assert_eq!(editor.staged(), None);
    }
}
