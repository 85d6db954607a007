// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Byteable Framework
//!
//! The uniform binary encoding contract used by every on-disk entity in the
//! kernel. A [`Byteable`] declares its encoded size, serializes itself into a
//! [`ByteSink`] in a deterministic order, and reconstructs through
//! [`FromBytes`] from a byte window that exactly covers one instance.
//!
//! ## Overview
//!
//! The framework has three pieces:
//!
//! - **Sinks** ([`sink`]) - destinations for big-endian encoding: a growable
//!   heap buffer, a fixed window (including mapped file windows), a hashing
//!   sink, and a null sink for size estimation. File-backed sinks live in the
//!   infrastructure layer of the kernel crate.
//! - **Sources** ([`source`]) - [`ByteReader`], a checked big-endian cursor
//!   over a byte window.
//! - **Contracts** (this module) - the [`Byteable`] and [`FromBytes`] traits.
//!
//! ## Design Principles
//!
//! - **Deterministic**: `copy_to` emits exactly `size()` bytes, always in the
//!   same order, so equal entities produce equal encodings.
//! - **Caller-spliced**: reconstruction is driven by the caller supplying the
//!   window `bytes[start..end]` that covers exactly one instance. The parent
//!   buffer is never inspected.
//! - **Static dispatch**: the mapping from chunk flavor to decoder is a closed
//!   set of generic instantiations, never runtime type discovery.
//! - **Canonical bytes**: entities whose logical identity is not their raw
//!   transport bytes (width-normalized integers) override
//!   [`Byteable::canonical_bytes`]; two equal entities must produce identical
//!   canonical bytes.

pub mod sink;
pub mod source;

pub use sink::{ByteSink, HashSink, HeapSink, NullSink, SliceSink};
pub use source::ByteReader;

use crate::error::StoreError;

/// The entity contract: a size-declaring, self-serializing value with a
/// deterministic binary form.
///
/// Implementations must uphold two invariants:
///
/// - `copy_to` writes exactly `size()` bytes.
/// - equal values produce identical [`canonical_bytes`](Byteable::canonical_bytes).
pub trait Byteable {
    /// The exact number of bytes `copy_to` will emit.
    fn size(&self) -> usize;

    /// Serializes this entity into `sink`, most-significant-byte first for
    /// every multi-byte field.
    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError>;

    /// The bytes used for equality and hashing.
    ///
    /// Defaults to the transport encoding. Overridden where logical identity
    /// differs from the stored form (e.g. width-normalized integers).
    fn canonical_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.to_bytes()
    }

    /// Renders the transport encoding into a fresh heap buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut sink = HeapSink::with_capacity(self.size());
        self.copy_to(&mut sink)?;
        Ok(sink.into_bytes())
    }
}

/// The buffer-window constructor inverse of [`Byteable`].
///
/// `window` must cover exactly one instance; trailing bytes are a
/// [`StoreError::DecodeError`]. Splicing a parent buffer into windows is the
/// caller's responsibility.
pub trait FromBytes: Sized {
    fn read_from(window: &[u8]) -> Result<Self, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(u16, u16);

    impl Byteable for Pair {
        fn size(&self) -> usize {
            4
        }

        fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
            sink.put_u16(self.0)?;
            sink.put_u16(self.1)
        }
    }

    impl FromBytes for Pair {
        fn read_from(window: &[u8]) -> Result<Self, StoreError> {
            let mut reader = ByteReader::new(window);
            let pair = Pair(reader.get_u16()?, reader.get_u16()?);
            reader.expect_end()?;
            Ok(pair)
        }
    }

    #[test]
    fn test_to_bytes_matches_declared_size() {
        let pair = Pair(0x0102, 0x0304);
        let bytes = pair.to_bytes().unwrap();
        assert_eq!(bytes.len(), pair.size());
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_window_round_trip() {
        let bytes = Pair(7, 9).to_bytes().unwrap();
        let decoded = Pair::read_from(&bytes).unwrap();
        assert_eq!(decoded.0, 7);
        assert_eq!(decoded.1, 9);
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut bytes = Pair(7, 9).to_bytes().unwrap();
        bytes.push(0xFF);
        assert!(Pair::read_from(&bytes).is_err());
    }
}
