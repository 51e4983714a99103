//! Edit nodes and the arena that owns them.
//!
//! An [`EditTree`] stores every node in a flat `Vec`, addressed by [`EditId`].
//! Parent and child links are indices, so a tree can be walked and mutated
//! during application without aliasing live references. Node `0` is the root.
//!
//! Ordering:
//! - Children are kept in ascending offset order.
//! - At equal offsets an insertion point sorts before a non-empty range.
//! - Equal insertion points keep the order they were added in. Applying
//!   siblings from the highest index down therefore leaves them in
//!   insertion order in the buffer.
//!
//! Grafting a tree under another (`add_child`) moves its nodes into the
//! parent's arena and renumbers them; ids handed out by the grafted tree are
//! not valid afterwards.

use crate::error::StructureError;
use crate::range::TextRange;
use core_text::{BufferError, TextBuffer};
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditId(usize);

impl EditId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edit#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Unattached,
    Connected,
    Executed,
}

/// Caller-defined edit semantics for [`EditKind::Custom`].
pub trait EditBehavior: fmt::Debug {
    /// Resolve against live content before any child is connected. Changing
    /// `range` here rejects the whole add.
    fn connect(
        &mut self,
        _range: &mut TextRange,
        _buffer: &dyn TextBuffer,
    ) -> Result<(), BufferError> {
        Ok(())
    }

    /// Text that replaces `range`, or `None` to leave the buffer untouched.
    fn replacement(
        &mut self,
        range: TextRange,
        buffer: &dyn TextBuffer,
    ) -> Result<Option<String>, BufferError>;

    /// Release connect-time state once the batch has completed.
    fn settled(&mut self) {}
}

#[derive(Debug)]
pub enum EditKind {
    /// Replace the range with `text`. Insert and delete are the degenerate cases.
    Replace { text: String },
    /// Aggregation only.
    Group,
    /// Insert the text `source` held at connect time.
    Copy {
        source: TextRange,
        captured: Option<String>,
    },
    Custom(Box<dyn EditBehavior>),
}

/// Description of a single change, before it is placed in a tree.
#[derive(Debug)]
pub struct TextEdit {
    range: TextRange,
    kind: EditKind,
}

impl TextEdit {
    pub fn replace(offset: usize, length: usize, text: impl Into<String>) -> Self {
        Self {
            range: TextRange::new(offset, length),
            kind: EditKind::Replace { text: text.into() },
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset, 0, text)
    }

    pub fn delete(offset: usize, length: usize) -> Self {
        Self::replace(offset, length, String::new())
    }

    pub fn group(offset: usize, length: usize) -> Self {
        Self {
            range: TextRange::new(offset, length),
            kind: EditKind::Group,
        }
    }

    /// Copy the content of `source` to the insertion point `target`.
    pub fn copy(source: TextRange, target: usize) -> Self {
        Self {
            range: TextRange::insertion_point(target),
            kind: EditKind::Copy {
                source,
                captured: None,
            },
        }
    }

    pub fn custom(range: TextRange, behavior: impl EditBehavior + 'static) -> Self {
        Self {
            range,
            kind: EditKind::Custom(Box::new(behavior)),
        }
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn kind(&self) -> &EditKind {
        &self.kind
    }
}

/// Outcome of applying one node: what was replaced and how long the new text is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Applied {
    pub(crate) range: TextRange,
    pub(crate) inserted: usize,
    pub(crate) removed: String,
}

impl Applied {
    pub(crate) fn delta(&self) -> isize {
        self.inserted as isize - self.range.length() as isize
    }
}

#[derive(Debug)]
struct EditNode {
    range: TextRange,
    kind: EditKind,
    parent: Option<EditId>,
    children: Vec<EditId>,
    state: EditState,
    replaced: Option<String>,
}

#[derive(Debug)]
pub struct EditTree {
    nodes: Vec<EditNode>,
}

const ROOT: EditId = EditId(0);

impl EditTree {
    pub fn new(edit: TextEdit) -> Self {
        Self {
            nodes: vec![EditNode {
                range: edit.range,
                kind: edit.kind,
                parent: None,
                children: Vec::new(),
                state: EditState::Unattached,
                replaced: None,
            }],
        }
    }

    pub fn root(&self) -> EditId {
        ROOT
    }

    /// Number of nodes, root included. Never zero.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children.
    pub fn is_leaf(&self) -> bool {
        self.nodes[ROOT.0].children.is_empty()
    }

    fn node(&self, id: EditId) -> &EditNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: EditId) -> &mut EditNode {
        &mut self.nodes[id.0]
    }

    /// Current range of `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this tree.
    pub fn range(&self, id: EditId) -> TextRange {
        self.node(id).range
    }

    pub fn kind(&self, id: EditId) -> &EditKind {
        &self.node(id).kind
    }

    pub fn state(&self, id: EditId) -> EditState {
        self.node(id).state
    }

    pub fn parent(&self, id: EditId) -> Option<EditId> {
        self.node(id).parent
    }

    /// Children in ascending offset order.
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this tree.
    pub fn children(&self, id: EditId) -> &[EditId] {
        &self.node(id).children
    }

    /// Text removed by the last apply of `id`.
    pub fn replaced(&self, id: EditId) -> Option<&str> {
        self.node(id).replaced.as_deref()
    }

    /// Pre-order walk starting at `from`, children in ascending offset order.
    pub fn preorder(&self, from: EditId) -> Vec<EditId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// True when applying `id` changes buffer content.
    pub fn is_mutating(&self, id: EditId) -> bool {
        let node = self.node(id);
        match &node.kind {
            EditKind::Replace { text } => !node.range.is_insertion_point() || !text.is_empty(),
            EditKind::Group => false,
            EditKind::Copy { source, .. } => !source.is_insertion_point(),
            EditKind::Custom(_) => true,
        }
    }

    /// Place `child` under `parent`, keeping sibling order.
    ///
    /// Fails without touching the tree if the child overlaps a sibling or
    /// leaves the parent's range.
    ///
    /// # Panics
    ///
    /// If `parent` was not issued by this tree.
    pub fn add_child(
        &mut self,
        parent: EditId,
        child: impl Into<EditTree>,
    ) -> Result<EditId, StructureError> {
        self.graft(parent, child.into(), true)
    }

    /// Shared by [`add_child`](Self::add_child) and the batch root, which only
    /// checks sibling disjointness and leaves bounds to validation.
    pub(crate) fn graft(
        &mut self,
        parent: EditId,
        child: EditTree,
        check_containment: bool,
    ) -> Result<EditId, StructureError> {
        let range = child.range(ROOT);
        let parent_range = self.range(parent);
        if check_containment && !parent_range.contains(&range) {
            return Err(StructureError::NotContained {
                child: range,
                parent: parent_range,
            });
        }
        if let Some(sibling) = self
            .children(parent)
            .iter()
            .map(|c| self.range(*c))
            .find(|r| r.overlaps(&range))
        {
            return Err(StructureError::Overlap {
                child: range,
                sibling,
            });
        }

        let position = self.child_position(parent, range);
        let base = self.nodes.len();
        for (i, mut node) in child.nodes.into_iter().enumerate() {
            node.parent = if i == 0 {
                Some(parent)
            } else {
                node.parent.map(|p| EditId(p.0 + base))
            };
            for c in &mut node.children {
                c.0 += base;
            }
            self.nodes.push(node);
        }
        let id = EditId(base);
        self.node_mut(parent).children.insert(position, id);
        trace!(target: "edit.tree", %parent, child = %id, range = %range, position, "graft");
        Ok(id)
    }

    fn child_position(&self, parent: EditId, range: TextRange) -> usize {
        let key = |r: TextRange| (r.offset(), !r.is_insertion_point());
        self.children(parent)
            .partition_point(|c| key(self.range(*c)) <= key(range))
    }

    /// Attach every node to `buffer`, parents before children.
    pub(crate) fn connect(&mut self, buffer: &dyn TextBuffer) -> Result<(), StructureError> {
        for id in self.preorder(ROOT) {
            let node = self.node_mut(id);
            let before = node.range;
            let mut after = before;
            match &mut node.kind {
                EditKind::Replace { .. } | EditKind::Group => {}
                EditKind::Copy { source, captured } => {
                    let text = buffer
                        .slice(source.offset(), source.length())
                        .map_err(|err| StructureError::Connect {
                            range: before,
                            source: err,
                        })?;
                    *captured = Some(text);
                }
                EditKind::Custom(behavior) => {
                    behavior
                        .connect(&mut after, buffer)
                        .map_err(|err| StructureError::Connect {
                            range: before,
                            source: err,
                        })?;
                }
            }
            if after != before {
                return Err(StructureError::RangeChangedOnConnect { before, after });
            }
            node.state = EditState::Connected;
        }
        trace!(target: "edit.connect", nodes = self.nodes.len(), "tree_connected");
        Ok(())
    }

    /// Perform the node's replacement. `Ok(None)` when the node leaves the buffer alone.
    pub(crate) fn apply(
        &mut self,
        id: EditId,
        buffer: &mut dyn TextBuffer,
    ) -> Result<Option<Applied>, BufferError> {
        let node = self.node_mut(id);
        let range = node.range;
        let text = match &mut node.kind {
            EditKind::Replace { text } if range.is_insertion_point() && text.is_empty() => None,
            EditKind::Replace { text } => Some(text.clone()),
            EditKind::Group => None,
            EditKind::Copy { source, captured } => match captured {
                Some(text) => Some(text.clone()),
                None => Some(buffer.slice(source.offset(), source.length())?),
            },
            EditKind::Custom(behavior) => behavior.replacement(range, &*buffer)?,
        };
        let Some(text) = text else {
            node.state = EditState::Executed;
            return Ok(None);
        };
        let removed = buffer.slice(range.offset(), range.length())?;
        buffer.replace(range.offset(), range.length(), &text)?;
        node.replaced = Some(removed.clone());
        node.state = EditState::Executed;
        Ok(Some(Applied {
            range,
            inserted: text.len(),
            removed,
        }))
    }

    /// Move the length of `id` and each of its ancestors by `delta`.
    pub(crate) fn rebase(&mut self, id: EditId, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node_mut(c);
            node.range = node.range.resized(delta);
            current = node.parent;
        }
    }

    pub(crate) fn settle(&mut self, id: EditId) {
        match &mut self.node_mut(id).kind {
            EditKind::Copy { captured, .. } => *captured = None,
            EditKind::Custom(behavior) => behavior.settled(),
            EditKind::Replace { .. } | EditKind::Group => {}
        }
    }
}

impl From<TextEdit> for EditTree {
    fn from(edit: TextEdit) -> Self {
        EditTree::new(edit)
    }
}
