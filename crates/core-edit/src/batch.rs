use crate::edit::{EditId, EditTree, TextEdit};
use crate::error::{StructureError, ValidationError};
use tracing::trace;

/// Aggregation root for the top-level edits of one session.
///
/// The root is a group over `[0, buffer_len)` as measured when the batch was
/// created. Top-level trees are only checked for sibling disjointness on add;
/// bounds are left to [`validate`](Self::validate).
#[derive(Debug)]
pub struct EditBatch {
    tree: EditTree,
}

impl EditBatch {
    pub fn new(buffer_len: usize) -> Self {
        Self {
            tree: EditTree::new(TextEdit::group(0, buffer_len)),
        }
    }

    pub fn add(&mut self, tree: EditTree) -> Result<EditId, StructureError> {
        let root = self.tree.root();
        self.tree.graft(root, tree, false)
    }

    /// Every node, root included, must end at or before `buffer_len`.
    pub fn validate(&self, buffer_len: usize) -> Result<(), ValidationError> {
        let root = self.tree.root();
        for id in self.tree.preorder(root) {
            let range = self.tree.range(id);
            if range.exclusive_end() > buffer_len {
                trace!(target: "edit.validate", edit = %id, range = %range, buffer_len, "out_of_bounds");
                return Err(ValidationError::OutOfBounds { range, buffer_len });
            }
        }
        Ok(())
    }

    /// True when at least one node changes buffer content.
    pub fn has_effect(&self) -> bool {
        let root = self.tree.root();
        self.tree
            .preorder(root)
            .into_iter()
            .any(|id| self.tree.is_mutating(id))
    }

    /// Number of top-level edits.
    pub fn edit_count(&self) -> usize {
        self.tree.children(self.tree.root()).len()
    }

    pub fn tree(&self) -> &EditTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut EditTree {
        &mut self.tree
    }
}
