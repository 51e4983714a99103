//! Editing session: one buffer, the batch editor that changes it, and an
//! undo engine holding inverse batches.
//!
//! Every `apply` stages its trees into a fresh [`BatchEditor`], executes them
//! as one batch and records the returned inverse. `undo` replays the top
//! inverse and keeps what that replay produced as the redo entry, so undo and
//! redo are the same operation pointed at different stacks.
//!
//! Failure handling:
//! - A batch or replay rejected before any mutation (staging or validation)
//!   leaves buffer and history as they were.
//! - A replay that fails part way leaves the buffer partly restored; the
//!   history is cleared since its offsets no longer match the buffer.

use anyhow::{Context, Result, bail};
use core_config::{Config, NoopSeverity};
use core_edit::{BatchEditor, EditError, EditTree, Severity, ValidationOptions, ValidationStatus};
use core_text::Buffer;
use tracing::{debug, info, warn};

pub mod undo;
use undo::UndoEngine;
pub use undo::{HistoryEntry, UNDO_HISTORY_MAX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

pub struct EditSession {
    buffer: Buffer,
    undo: UndoEngine,
    options: ValidationOptions,
}

impl EditSession {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            undo: UndoEngine::new(),
            options: ValidationOptions::default(),
        }
    }

    /// Session using the history limit and no-op severity from `config`.
    pub fn with_config(buffer: Buffer, config: &Config) -> Self {
        let noop_severity = match config.noop_batches() {
            NoopSeverity::Ok => Severity::Ok,
            NoopSeverity::Warning => Severity::Warning,
            NoopSeverity::Error => Severity::Error,
        };
        Self {
            buffer,
            undo: UndoEngine::with_max(config.effective_history_max),
            options: ValidationOptions { noop_severity },
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
    pub fn history(&self) -> &UndoEngine {
        &self.undo
    }
    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }
    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Execute `trees` as one batch and record its inverse under `label`.
    ///
    /// Returns the validation status the batch passed with (a warning is
    /// not an error).
    pub fn apply<I, T>(&mut self, label: &str, trees: I) -> Result<ValidationStatus>
    where
        I: IntoIterator<Item = T>,
        T: Into<EditTree>,
    {
        let mut editor = BatchEditor::new(&mut self.buffer).with_options(self.options);
        for tree in trees {
            editor
                .add(tree)
                .with_context(|| format!("staging batch {label:?}"))?;
        }
        let status = editor.validate();
        if let Some(err) = status.validation_error() {
            bail!("batch {label:?} rejected: {err}");
        }
        let inverse = editor
            .execute(None)
            .with_context(|| format!("executing batch {label:?}"))?;
        info!(target: "state.undo", label, entries = inverse.len(), severity = %status.severity(), "batch_applied");
        self.undo.record(HistoryEntry::new(label, inverse));
        Ok(status)
    }

    /// Revert the most recent batch. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.step(Direction::Undo)
    }

    /// Reapply the most recently undone batch. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.step(Direction::Redo)
    }

    fn step(&mut self, direction: Direction) -> Result<bool> {
        let entry = match direction {
            Direction::Undo => self.undo.pop_undo(),
            Direction::Redo => self.undo.pop_redo(),
        };
        let Some(entry) = entry else {
            debug!(target: "state.undo", ?direction, "history_empty");
            return Ok(false);
        };

        let mut editor = BatchEditor::new(&mut self.buffer).with_options(self.options);
        editor.add_inverse(entry.inverse.clone())?;
        match editor.execute(None) {
            Ok(replayed) => {
                let next = HistoryEntry::new(entry.label, replayed);
                match direction {
                    Direction::Undo => self.undo.push_redo(next),
                    Direction::Redo => self.undo.push_undo(next),
                }
                Ok(true)
            }
            Err(err @ EditError::Validation(_)) => {
                warn!(target: "state.undo", ?direction, label = %entry.label, %err, "replay_rejected");
                let label = entry.label.clone();
                match direction {
                    Direction::Undo => self.undo.push_undo(entry),
                    Direction::Redo => self.undo.push_redo(entry),
                }
                Err(err).with_context(|| format!("replaying {label:?}"))
            }
            Err(err) => {
                warn!(target: "state.undo", ?direction, label = %entry.label, %err, "replay_failed");
                self.undo.clear();
                Err(err).with_context(|| format!("replaying {:?}", entry.label))
            }
        }
    }
}
