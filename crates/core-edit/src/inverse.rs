use crate::error::{ExecutionError, ValidationError};
use crate::progress::ProgressSink;
use crate::range::TextRange;
use crate::tracker::ApplyTracker;
use core_text::TextBuffer;
use tracing::trace;

/// One recorded change: `range` is where the new text sits, `text` is what it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InverseEdit {
    range: TextRange,
    text: String,
}

impl InverseEdit {
    pub fn new(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length change of the buffer when this entry is replayed.
    pub fn delta(&self) -> isize {
        self.text.len() as isize - self.range.length() as isize
    }
}

/// Inverse of one successful execution, in replay order.
///
/// Entries are stored in the reverse of the order their changes were
/// applied, so replaying front to back restores the prior content exactly.
/// Replaying produces another `InverseBatch` (the redo).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InverseBatch {
    edits: Vec<InverseEdit>,
}

impl InverseBatch {
    pub(crate) fn from_edits(edits: Vec<InverseEdit>) -> Self {
        Self { edits }
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InverseEdit> {
        self.edits.iter()
    }

    /// Buffer length change caused by replaying the whole batch.
    pub fn net_delta(&self) -> isize {
        self.edits.iter().map(InverseEdit::delta).sum()
    }

    /// Bounds check in replay order: each entry must fit the buffer length
    /// left behind by the entries before it.
    pub fn validate_against(&self, buffer_len: usize) -> Result<(), ValidationError> {
        let mut len = buffer_len;
        for (index, entry) in self.edits.iter().enumerate() {
            if entry.range.exclusive_end() > len {
                trace!(target: "edit.validate", index, range = %entry.range, buffer_len = len, "inverse_out_of_bounds");
                return Err(ValidationError::InverseOutOfBounds {
                    index,
                    range: entry.range,
                    buffer_len: len,
                });
            }
            len = len.saturating_add_signed(entry.delta());
        }
        Ok(())
    }

    /// Apply every entry through `tracker`, which records the redo.
    pub fn replay<B: TextBuffer>(
        &self,
        tracker: &mut ApplyTracker<'_, B>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        progress.begin("", self.edits.len());
        for (index, entry) in self.edits.iter().enumerate() {
            tracker.check_cancelled(progress)?;
            tracker.apply_inverse(index, entry)?;
            progress.worked(1);
        }
        Ok(())
    }

    /// Completion notification, last entry first.
    pub fn settled(&self, progress: &mut dyn ProgressSink) {
        progress.begin("", self.edits.len());
        for (index, entry) in self.edits.iter().enumerate().rev() {
            trace!(target: "edit.apply", index, range = %entry.range, "inverse_settled");
            progress.worked(1);
        }
    }
}

impl<'a> IntoIterator for &'a InverseBatch {
    type Item = &'a InverseEdit;
    type IntoIter = std::slice::Iter<'a, InverseEdit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn batch(entries: &[(usize, usize, &str)]) -> InverseBatch {
        InverseBatch::from_edits(
            entries
                .iter()
                .map(|(o, l, t)| InverseEdit::new(TextRange::new(*o, *l), *t))
                .collect(),
        )
    }

    #[test]
    fn replay_restores_and_records_redo() {
        let mut buf = Buffer::from_str("t", "XYZbcdFF");
        let undo = batch(&[(0, 3, "a"), (4, 2, "ef")]);
        assert_eq!(undo.net_delta(), -2);
        let mut tracker = ApplyTracker::attach(&mut buf).unwrap();
        undo.replay(&mut tracker, &mut NoProgress).unwrap();
        assert_eq!(tracker.buffer().text(), "abcdef");
        let redo = tracker.finish();
        assert_eq!(redo, batch(&[(4, 2, "FF"), (0, 1, "XYZ")]));
    }

    #[test]
    fn validation_tracks_running_length() {
        let undo = batch(&[(0, 3, ""), (4, 1, "x")]);
        assert!(undo.validate_against(8).is_ok());
        assert!(undo.validate_against(20).is_ok());
        let err = undo.validate_against(7).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InverseOutOfBounds {
                index: 1,
                range: TextRange::new(4, 1),
                buffer_len: 4
            }
        );
    }

    #[test]
    fn replay_failure_names_entry() {
        let mut buf = Buffer::from_str("t", "ab");
        let undo = batch(&[(0, 1, "z"), (5, 1, "")]);
        let mut tracker = ApplyTracker::attach(&mut buf).unwrap();
        let err = undo.replay(&mut tracker, &mut NoProgress).unwrap_err();
        assert!(matches!(err, ExecutionError::Replay { index: 1, .. }));
    }
}
