// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Position Value Object
//!
//! A `(record, offset)` pair: where inside a record's field value a corpus
//! term occurs. The offset counts characters from the start of the indexed
//! value. Positions order by record first, then offset, which groups a
//! term's occurrences by record in the corpus index.

use std::fmt;

use crate::byteable::{ByteReader, ByteSink, Byteable, FromBytes};
use crate::error::StoreError;
use crate::value_objects::Identifier;

/// A character position of a term occurrence within a record's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    record: Identifier,
    offset: u32,
}

impl Position {
    pub const ENCODED_SIZE: usize = Identifier::ENCODED_SIZE + 4;

    pub fn new(record: Identifier, offset: u32) -> Self {
        Self { record, offset }
    }

    pub fn record(&self) -> Identifier {
        self.record
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.record, self.offset)
    }
}

impl Byteable for Position {
    fn size(&self) -> usize {
        Self::ENCODED_SIZE
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        self.record.copy_to(sink)?;
        sink.put_u32(self.offset)
    }
}

impl FromBytes for Position {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(window);
        let record = Identifier::new(reader.get_u64()?);
        let offset = reader.get_u32()?;
        reader.expect_end()?;
        Ok(Self { record, offset })
    }
}
