//! Text-edit composition and application engine.
//!
//! A batch of possibly nested edits is built as an [`EditTree`], staged into a
//! [`BatchEditor`] over one [`TextBuffer`](core_text::TextBuffer), validated,
//! and executed. Execution returns an [`InverseBatch`] that, staged and
//! executed in turn, restores the prior content byte for byte (and returns the
//! redo).
//!
//! Invariants enforced while building:
//! - Siblings never overlap, except insertion points at the same offset.
//! - Every child lies within its parent.
//! - Connecting an edit to the buffer never changes its range.
//!
//! Validation checks that nothing ends past the buffer. Execution applies
//! siblings from the highest offset down (see [`tracker`]) and does not roll
//! back on failure.

pub mod batch;
pub mod edit;
pub mod editor;
pub mod error;
pub mod inverse;
pub mod progress;
pub mod range;
pub mod status;
pub mod tracker;

pub use batch::EditBatch;
pub use edit::{EditBehavior, EditId, EditKind, EditState, EditTree, TextEdit};
pub use editor::{AllowAll, BatchEditor, MutationPolicy, StructuralDryRun, ValidationOptions};
pub use error::{EditError, ExecutionError, StagedKind, StructureError, ValidationError};
pub use inverse::{InverseBatch, InverseEdit};
pub use progress::{NoProgress, ProgressSink, SubProgress};
pub use range::TextRange;
pub use status::{Severity, ValidationStatus};
pub use tracker::{ActiveNode, ApplyTracker};
