// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Composite Value Object
//!
//! A deterministic multi-part key: an ordered list of Byteables serialized as
//! `[offset0 | bytes0 | offset1 | bytes1 | ...]`, where each offset is the
//! 32-bit big-endian byte offset of that part's data within the concatenated
//! part data. Composites key the Bloom filters and the chunk manifests.
//!
//! ## Size Bound
//!
//! The stored form is bounded at [`MAX_COMPOSITE_SIZE`] bytes: if the
//! canonical encoding would exceed the bound, the SHA-256 digest of that same
//! encoding is stored instead. Either way, equality and hashing are over the
//! stored bytes only, so two Composites built from equal parts in the same
//! order always compare equal.
//!
//! ## Parts Retention
//!
//! The construction path retains the encoded parts for callers that need to
//! introspect them; the load-from-bytes path discards them and
//! [`Composite::parts`] returns `None`. Code whose correctness depends on
//! recovering parts must therefore hold on to the construction-path instance.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::byteable::{ByteSink, Byteable, FromBytes, HashSink, HeapSink};
use crate::error::StoreError;

/// Upper bound on the stored size of a [`Composite`], in bytes.
///
/// Also the width of a SHA-256 digest, so the fallback form fits exactly.
pub const MAX_COMPOSITE_SIZE: usize = 32;

/// An ordered tuple of Byteables encoded into at most
/// [`MAX_COMPOSITE_SIZE`] bytes.
#[derive(Debug, Clone)]
pub struct Composite {
    bytes: Vec<u8>,
    parts: Option<Vec<Vec<u8>>>,
}

impl Composite {
    /// Builds a Composite from `parts`, retaining their encodings.
    pub fn of(parts: &[&dyn Byteable]) -> Result<Self, StoreError> {
        let mut encoded_parts = Vec::with_capacity(parts.len());
        let mut encoding = HeapSink::new();
        let mut data_offset = 0u32;
        for part in parts {
            let bytes = part.to_bytes()?;
            encoding.put_u32(data_offset)?;
            encoding.put_slice(&bytes)?;
            data_offset = data_offset
                .checked_add(bytes.len() as u32)
                .ok_or_else(|| StoreError::capacity_error("composite part data exceeds u32 offsets"))?;
            encoded_parts.push(bytes);
        }
        let encoding = encoding.into_bytes();
        let bytes = if encoding.len() <= MAX_COMPOSITE_SIZE {
            encoding
        } else {
            digest(&encoding)?
        };
        Ok(Self {
            bytes,
            parts: Some(encoded_parts),
        })
    }

    /// Restores a Composite from its stored form. Parts are not recoverable
    /// on this path.
    pub fn load(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() > MAX_COMPOSITE_SIZE {
            return Err(StoreError::decode_error(format!(
                "composite of {} bytes exceeds the {}-byte bound",
                bytes.len(),
                MAX_COMPOSITE_SIZE
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
            parts: None,
        })
    }

    /// The stored bytes: the canonical encoding when it fits, otherwise its
    /// SHA-256 digest.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The encoded parts, when this instance came through the construction
    /// path; `None` after [`Composite::load`].
    pub fn parts(&self) -> Option<&[Vec<u8>]> {
        self.parts.as_deref()
    }
}

/// SHA-256 of `encoding`, via the hashing sink so the digested bytes are
/// exactly the canonical encoding.
fn digest(encoding: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut sink = HashSink::new();
    sink.put_slice(encoding)?;
    Ok(sink.finish().to_vec())
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        // Stored bytes only; parts retention is irrelevant to identity.
        self.bytes == other.bytes
    }
}

impl Eq for Composite {}

impl PartialOrd for Composite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Composite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Composite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.bytes))
    }
}

impl Byteable for Composite {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        sink.put_slice(&self.bytes)
    }
}

impl FromBytes for Composite {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        Self::load(window)
    }
}
