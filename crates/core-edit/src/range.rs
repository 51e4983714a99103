use std::fmt;

/// Half-open byte interval `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    offset: usize,
    length: usize,
}

impl TextRange {
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Zero-length range at `offset`.
    pub const fn insertion_point(offset: usize) -> Self {
        Self { offset, length: 0 }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn length(&self) -> usize {
        self.length
    }

    /// `offset + length`, saturating at `usize::MAX`.
    pub const fn exclusive_end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    pub const fn is_insertion_point(&self) -> bool {
        self.length == 0
    }

    /// True when the interiors intersect.
    ///
    /// Two insertion points never overlap, even at the same offset. An
    /// insertion point overlaps a non-empty range only when it sits strictly
    /// inside it; touching either boundary is fine.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        match (self.is_insertion_point(), other.is_insertion_point()) {
            (true, true) => false,
            (true, false) => other.strictly_inside(self.offset),
            (false, true) => self.strictly_inside(other.offset),
            (false, false) => {
                self.offset < other.exclusive_end() && other.offset < self.exclusive_end()
            }
        }
    }

    /// True when `other` lies within `self` (boundaries inclusive).
    pub fn contains(&self, other: &TextRange) -> bool {
        self.offset <= other.offset && other.exclusive_end() <= self.exclusive_end()
    }

    fn strictly_inside(&self, pos: usize) -> bool {
        self.offset < pos && pos < self.exclusive_end()
    }

    /// Range with the same offset and the length moved by `delta`.
    pub(crate) fn resized(&self, delta: isize) -> Self {
        Self {
            offset: self.offset,
            length: self.length.saturating_add_signed(delta),
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.exclusive_end())
    }
}
