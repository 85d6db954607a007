// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Identifier Value Object
//!
//! A 64-bit record id. Identifiers are assigned by the engine layer above the
//! kernel; the kernel only stores, orders, and round-trips them. The transport
//! form is the 8-byte big-endian encoding, which is also the canonical form.

use std::fmt;

use crate::byteable::{ByteReader, ByteSink, Byteable, FromBytes};
use crate::error::StoreError;

/// A 64-bit record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(u64);

impl Identifier {
    pub const ENCODED_SIZE: usize = 8;

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Byteable for Identifier {
    fn size(&self) -> usize {
        Self::ENCODED_SIZE
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        sink.put_u64(self.0)
    }
}

impl FromBytes for Identifier {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(window);
        let id = reader.get_u64()?;
        reader.expect_end()?;
        Ok(Self(id))
    }
}
