//! Text storage seam for the edit engine.
//!
//! The engine only ever talks to a [`TextBuffer`]: five operations over UTF-8
//! byte offsets (`len`, `slice`, `replace`, `attach`, `detach`). [`Buffer`] is
//! the rope-backed implementation used by the session layer and the tests.
//!
//! Attach/Detach:
//! - An apply tracker registers itself for the duration of one execution call
//!   and unregisters on every exit path. The buffer only keeps the ids; it
//!   never calls back into the tracker.
//! - Attaching the same id twice is an error. Detaching an unknown id is a no-op.
//!
//! Offsets:
//! - All offsets are absolute byte offsets. `slice` and `replace` reject ranges
//!   past the end and offsets that split a UTF-8 sequence.

use ropey::Rope;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::trace;

static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an apply tracker registered with a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerId(u64);

impl TrackerId {
    /// Allocate a process-unique tracker id.
    pub fn next() -> Self {
        Self(NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracker#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("range [{offset}, {offset}+{length}) exceeds buffer length {len}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        len: usize,
    },
    #[error("offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
    #[error("{0} is already attached to this buffer")]
    AlreadyAttached(TrackerId),
}

/// Mutable text storage driven by the edit engine.
pub trait TextBuffer {
    /// Total length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the bytes in `[offset, offset + length)`.
    fn slice(&self, offset: usize, length: usize) -> Result<String, BufferError>;

    /// Replace `[offset, offset + length)` with `text`.
    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), BufferError>;

    fn attach(&mut self, tracker: TrackerId) -> Result<(), BufferError>;

    fn detach(&mut self, tracker: TrackerId);
}

/// A text buffer backed by a `ropey::Rope`.
pub struct Buffer {
    rope: Rope,
    pub name: String,
    revision: u64,
    trackers: Vec<TrackerId>,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: impl Into<String>, content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            name: name.into(),
            revision: 0,
            trackers: Vec::new(),
        }
    }

    /// Full content as an owned `String`.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Return the requested line as an owned `String` (including trailing newline if present).
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx < self.rope.len_lines() {
            Some(self.rope.line(idx).to_string())
        } else {
            None
        }
    }

    /// Number of successful `replace` calls since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Trackers currently attached, in attach order.
    pub fn attached(&self) -> &[TrackerId] {
        &self.trackers
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<(usize, usize), BufferError> {
        let len = self.rope.len_bytes();
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= len)
            .ok_or(BufferError::OutOfBounds {
                offset,
                length,
                len,
            })?;
        Ok((self.char_index(offset)?, self.char_index(end)?))
    }

    // Caller guarantees `byte <= len_bytes`.
    fn char_index(&self, byte: usize) -> Result<usize, BufferError> {
        let ch = self.rope.byte_to_char(byte);
        if self.rope.char_to_byte(ch) != byte {
            return Err(BufferError::NotCharBoundary { offset: byte });
        }
        Ok(ch)
    }
}

impl TextBuffer for Buffer {
    fn len(&self) -> usize {
        self.rope.len_bytes()
    }

    fn slice(&self, offset: usize, length: usize) -> Result<String, BufferError> {
        let (start, end) = self.check_range(offset, length)?;
        Ok(self.rope.slice(start..end).to_string())
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), BufferError> {
        let (start, end) = self.check_range(offset, length)?;
        if start < end {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
        self.revision += 1;
        trace!(target: "text.buffer", buffer = self.name.as_str(), offset, length, inserted = text.len(), revision = self.revision, "replace");
        Ok(())
    }

    fn attach(&mut self, tracker: TrackerId) -> Result<(), BufferError> {
        if self.trackers.contains(&tracker) {
            return Err(BufferError::AlreadyAttached(tracker));
        }
        self.trackers.push(tracker);
        trace!(target: "text.buffer", buffer = self.name.as_str(), %tracker, attached = self.trackers.len(), "attach");
        Ok(())
    }

    fn detach(&mut self, tracker: TrackerId) {
        self.trackers.retain(|t| *t != tracker);
        trace!(target: "text.buffer", buffer = self.name.as_str(), %tracker, attached = self.trackers.len(), "detach");
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("len", &self.rope.len_bytes())
            .field("revision", &self.revision)
            .finish()
    }
}
