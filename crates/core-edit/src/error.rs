use crate::edit::EditId;
use crate::range::TextRange;
use core_text::BufferError;
use std::fmt;
use thiserror::Error;

/// Tree shape violations raised while building or staging a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("edit {child} overlaps sibling {sibling}")]
    Overlap {
        child: TextRange,
        sibling: TextRange,
    },
    #[error("edit {child} is not contained in parent {parent}")]
    NotContained {
        child: TextRange,
        parent: TextRange,
    },
    #[error("edit range changed during connect: {before} became {after}")]
    RangeChangedOnConnect {
        before: TextRange,
        after: TextRange,
    },
    #[error("edit {range} failed to connect")]
    Connect {
        range: TextRange,
        #[source]
        source: BufferError,
    },
}

/// Bounds failures reported by validation. The batch never executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("edit {range} ends past buffer length {buffer_len}")]
    OutOfBounds { range: TextRange, buffer_len: usize },
    #[error("inverse entry {index} at {range} ends past buffer length {buffer_len}")]
    InverseOutOfBounds {
        index: usize,
        range: TextRange,
        buffer_len: usize,
    },
    #[error("batch contains no text changes")]
    NoEffect,
}

/// Hard failures during traversal. Edits applied before the failure stay applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("apply tracker could not attach to buffer")]
    Attach(#[source] BufferError),
    #[error("{edit} at {range} failed to apply")]
    Apply {
        edit: EditId,
        range: TextRange,
        #[source]
        source: BufferError,
    },
    #[error("inverse entry {index} at {range} failed to replay")]
    Replay {
        index: usize,
        range: TextRange,
        #[source]
        source: BufferError,
    },
    #[error("execution cancelled after {applied} applied edits")]
    Cancelled { applied: usize },
}

/// What a [`BatchEditor`](crate::BatchEditor) currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    Forward,
    Inverse,
}

impl fmt::Display for StagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagedKind::Forward => f.write_str("a forward batch"),
            StagedKind::Inverse => f.write_str("an inverse batch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("cannot stage {incoming} while {staged} is staged")]
    StagingConflict {
        staged: StagedKind,
        incoming: StagedKind,
    },
}
