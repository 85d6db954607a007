// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text Value Object
//!
//! A UTF-8 string that is either whole or a zero-copy view `(buffer, start,
//! end)` into a larger shared buffer. The view form exists for substring
//! indexing: enumerating the substrings of a long corpus value must not copy
//! the parent string once per substring.
//!
//! ## Design Principles
//!
//! - **Value semantics**: two `Text`s are equal iff their visible string
//!   content is equal, regardless of how the backing buffers are shared.
//! - **Cheap clones**: the backing buffer is an `Arc<str>`, so cloning a view
//!   is two pointer copies.
//! - **Transport form**: the unprefixed UTF-8 bytes of the visible slice.
//!   Length prefixes belong to the enclosing encoding (revisions prefix every
//!   field with its length).

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::byteable::{ByteSink, Byteable, FromBytes};
use crate::error::StoreError;

/// A UTF-8 string, possibly a view into a shared buffer.
#[derive(Debug, Clone)]
pub struct Text {
    buf: Arc<str>,
    start: usize,
    end: usize,
}

impl Text {
    /// Creates a `Text` owning the whole of `content`.
    pub fn new(content: impl Into<String>) -> Self {
        let buf: Arc<str> = Arc::from(content.into());
        let end = buf.len();
        Self { buf, start: 0, end }
    }

    /// Creates a zero-copy view over `buf[start..end]` (byte offsets).
    ///
    /// Panics if the range is not on character boundaries, matching the
    /// standard library's string-slicing contract.
    pub fn view(buf: Arc<str>, start: usize, end: usize) -> Self {
        // Force the boundary checks up front rather than on first use.
        let _ = &buf[start..end];
        Self { buf, start, end }
    }

    /// A sub-view of this text over `start..end` byte offsets relative to
    /// this view. Shares the backing buffer.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self::view(Arc::clone(&self.buf), self.start + start, self.start + end)
    }

    /// The visible string content.
    pub fn as_str(&self) -> &str {
        &self.buf[self.start..self.end]
    }

    /// Length of the visible content in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The backing buffer and this view's byte range within it.
    ///
    /// The brute-force substring deduplicator uses this to reason about where
    /// in the parent a view begins without comparing buffer pointers.
    pub fn backing(&self) -> (&Arc<str>, usize, usize) {
        (&self.buf, self.start, self.end)
    }
}

impl From<&str> for Text {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Text {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Text {}

impl PartialOrd for Text {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Text {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for Text {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Byteable for Text {
    fn size(&self) -> usize {
        self.len()
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        sink.put_utf8(self.as_str())
    }
}

impl FromBytes for Text {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        let content = std::str::from_utf8(window)
            .map_err(|e| StoreError::decode_error(format!("text window is not valid UTF-8: {}", e)))?;
        Ok(Self::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_equals_owned() {
        let parent = Text::new("hello world");
        let view = parent.slice(6, 11);
        assert_eq!(view, Text::new("world"));
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn test_views_share_the_backing_buffer() {
        let parent = Text::new("abcdef");
        let view = parent.slice(1, 4);
        let (buf, start, end) = view.backing();
        assert!(Arc::ptr_eq(buf, parent.backing().0));
        assert_eq!((start, end), (1, 4));
    }

    #[test]
    fn test_round_trip() {
        let text = Text::new("schemaless");
        let bytes = text.to_bytes().unwrap();
        assert_eq!(bytes, b"schemaless");
        assert_eq!(Text::read_from(&bytes).unwrap(), text);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = Text::read_from(&[0xFF, 0xFE]).unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_multibyte_slicing() {
        let text = Text::new("héllo");
        let view = text.slice(0, 3); // "hé" is 3 bytes
        assert_eq!(view.as_str(), "hé");
        assert_eq!(view.size(), 3);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(Text::new("a") < Text::new("b"));
        assert!(Text::new("ab") < Text::new("b"));
        assert!(Text::new("a") < Text::new("ab"));
    }
}
