// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Revision Value Object
//!
//! The unit of durable change: `(locator, key, value, version, action)`.
//! Three flavors share one generic shape, differing only in their component
//! types:
//!
//! | Flavor | Locator | Key | Value | Answers |
//! |---|---|---|---|---|
//! | [`TableFlavor`] | record | field | value | what fields does record R hold? |
//! | [`IndexFlavor`] | field | value | record | which records have field = V? |
//! | [`CorpusFlavor`] | field | term | position | where does term T occur under field F? |
//!
//! The flavors are a closed set of generic instantiations; there is no
//! runtime type discovery anywhere in the decode path.
//!
//! ## Wire Form
//!
//! ```text
//! revision := version(8) action(1) locator_len(4) locator_bytes
//!             key_len(4) key_bytes value_len(4) value_bytes
//! ```
//!
//! All integers big-endian; `action` is 0 for ADD and 1 for REMOVE. There is
//! no per-file header: a chunk file is a bare concatenation of revisions, and
//! the manifest and Bloom filter are sibling files.
//!
//! ## Toggle Semantics
//!
//! A logical binding `(locator, key, value)` is present at time `t` iff the
//! count of ADDs minus REMOVEs across versions `<= t` is odd. Revisions sort
//! by `(locator, key, value, version)` ascending, with ADD before REMOVE on a
//! full tie.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use crate::byteable::{ByteReader, ByteSink, Byteable, FromBytes};
use crate::error::StoreError;
use crate::value_objects::{Composite, Identifier, Position, Text, Value};

/// The bounds every revision component satisfies: encodable, reconstructible,
/// totally ordered, hashable, and freely shareable across threads.
pub trait Entity: Byteable + FromBytes + Ord + Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Entity for T where T: Byteable + FromBytes + Ord + Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// A chunk flavor: the component types of one of the three indexes.
pub trait ChunkFlavor: Send + Sync + 'static {
    type Locator: Entity;
    type Key: Entity;
    type Value: Entity;

    /// Short name used for file naming and diagnostics.
    const NAME: &'static str;
}

/// The record-oriented index: "what fields does record R hold?"
#[derive(Debug)]
pub struct TableFlavor;

impl ChunkFlavor for TableFlavor {
    type Locator = Identifier;
    type Key = Text;
    type Value = Value;

    const NAME: &'static str = "table";
}

/// The value-oriented index: "which records have field = V?"
#[derive(Debug)]
pub struct IndexFlavor;

impl ChunkFlavor for IndexFlavor {
    type Locator = Text;
    type Key = Value;
    type Value = Identifier;

    const NAME: &'static str = "index";
}

/// The full-text index: "which (record, offset) contain term T under field F?"
#[derive(Debug)]
pub struct CorpusFlavor;

impl ChunkFlavor for CorpusFlavor {
    type Locator = Text;
    type Key = Text;
    type Value = Position;

    const NAME: &'static str = "corpus";
}

/// Whether a revision asserts or retracts its binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Action {
    Add = 0,
    Remove = 1,
}

impl Action {
    pub fn from_u8(raw: u8) -> Result<Self, StoreError> {
        match raw {
            0 => Ok(Action::Add),
            1 => Ok(Action::Remove),
            other => Err(StoreError::decode_error(format!("invalid action byte {:#04x}", other))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => write!(f, "ADD"),
            Action::Remove => write!(f, "REMOVE"),
        }
    }
}

/// One durable change record of flavor `F`.
pub struct Revision<F: ChunkFlavor> {
    locator: F::Locator,
    key: F::Key,
    value: F::Value,
    version: u64,
    action: Action,
}

impl<F: ChunkFlavor> Revision<F> {
    pub fn new(locator: F::Locator, key: F::Key, value: F::Value, version: u64, action: Action) -> Self {
        Self {
            locator,
            key,
            value,
            version,
            action,
        }
    }

    pub fn locator(&self) -> &F::Locator {
        &self.locator
    }

    pub fn key(&self) -> &F::Key {
        &self.key
    }

    pub fn value(&self) -> &F::Value {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// `Composite(locator)` - the coarse manifest level.
    pub fn locator_composite(&self) -> Result<Composite, StoreError> {
        Composite::of(&[&self.locator])
    }

    /// `Composite(locator, key)` - the fine manifest level.
    pub fn locator_key_composite(&self) -> Result<Composite, StoreError> {
        Composite::of(&[&self.locator, &self.key])
    }

    /// `Composite(locator, key, value)` - the Bloom membership key.
    pub fn full_composite(&self) -> Result<Composite, StoreError> {
        Composite::of(&[&self.locator, &self.key, &self.value])
    }

    /// Decodes the next revision from a reader positioned at a revision
    /// boundary, consuming exactly one wire record.
    pub fn read_next(reader: &mut ByteReader<'_>) -> Result<Self, StoreError> {
        let version = reader.get_u64()?;
        let action = Action::from_u8(reader.get_u8()?)?;
        let locator_len = reader.get_u32()? as usize;
        let locator = F::Locator::read_from(reader.take(locator_len)?)?;
        let key_len = reader.get_u32()? as usize;
        let key = F::Key::read_from(reader.take(key_len)?)?;
        let value_len = reader.get_u32()? as usize;
        let value = F::Value::read_from(reader.take(value_len)?)?;
        Ok(Self {
            locator,
            key,
            value,
            version,
            action,
        })
    }
}

impl<F: ChunkFlavor> Clone for Revision<F> {
    fn clone(&self) -> Self {
        Self {
            locator: self.locator.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            version: self.version,
            action: self.action,
        }
    }
}

impl<F: ChunkFlavor> fmt::Debug for Revision<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revision")
            .field("flavor", &F::NAME)
            .field("locator", &self.locator)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("version", &self.version)
            .field("action", &self.action)
            .finish()
    }
}

impl<F: ChunkFlavor> PartialEq for Revision<F> {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
            && self.key == other.key
            && self.value == other.value
            && self.version == other.version
            && self.action == other.action
    }
}

impl<F: ChunkFlavor> Eq for Revision<F> {}

impl<F: ChunkFlavor> PartialOrd for Revision<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: ChunkFlavor> Ord for Revision<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.locator
            .cmp(&other.locator)
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.version.cmp(&other.version))
            // Not expected, but defensive: ADD sorts before REMOVE.
            .then_with(|| self.action.cmp(&other.action))
    }
}

impl<F: ChunkFlavor> Byteable for Revision<F> {
    fn size(&self) -> usize {
        8 + 1 + 4 + self.locator.size() + 4 + self.key.size() + 4 + self.value.size()
    }

    fn copy_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        sink.put_u64(self.version)?;
        sink.put_u8(self.action as u8)?;
        sink.put_u32(self.locator.size() as u32)?;
        self.locator.copy_to(sink)?;
        sink.put_u32(self.key.size() as u32)?;
        self.key.copy_to(sink)?;
        sink.put_u32(self.value.size() as u32)?;
        self.value.copy_to(sink)
    }
}

impl<F: ChunkFlavor> FromBytes for Revision<F> {
    fn read_from(window: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(window);
        let revision = Self::read_next(&mut reader)?;
        reader.expect_end()?;
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_revision(record: u64, field: &str, value: Value, version: u64, action: Action) -> Revision<TableFlavor> {
        Revision::new(Identifier::new(record), Text::new(field), value, version, action)
    }

    #[test]
    fn test_wire_layout() {
        let revision = table_revision(1, "a", Value::Bool(true), 5, Action::Remove);
        let bytes = revision.to_bytes().unwrap();
        assert_eq!(bytes.len(), revision.size());
        // version
        assert_eq!(&bytes[..8], &5u64.to_be_bytes());
        // action
        assert_eq!(bytes[8], 1);
        // locator_len + locator
        assert_eq!(&bytes[9..13], &8u32.to_be_bytes());
        assert_eq!(&bytes[13..21], &1u64.to_be_bytes());
        // key_len + key
        assert_eq!(&bytes[21..25], &1u32.to_be_bytes());
        assert_eq!(bytes[25], b'a');
        // value_len + value
        assert_eq!(&bytes[26..30], &2u32.to_be_bytes());
    }

    #[test]
    fn test_round_trip_all_flavors() {
        let table = table_revision(1, "age", Value::Int(30), 9, Action::Add);
        let bytes = table.to_bytes().unwrap();
        assert_eq!(Revision::<TableFlavor>::read_from(&bytes).unwrap(), table);

        let index: Revision<IndexFlavor> =
            Revision::new(Text::new("age"), Value::Int(30), Identifier::new(1), 9, Action::Add);
        let bytes = index.to_bytes().unwrap();
        assert_eq!(Revision::<IndexFlavor>::read_from(&bytes).unwrap(), index);

        let corpus: Revision<CorpusFlavor> = Revision::new(
            Text::new("bio"),
            Text::new("ab"),
            Position::new(Identifier::new(7), 0),
            9,
            Action::Add,
        );
        let bytes = corpus.to_bytes().unwrap();
        assert_eq!(Revision::<CorpusFlavor>::read_from(&bytes).unwrap(), corpus);
    }

    #[test]
    fn test_sort_order() {
        let mut revisions = vec![
            table_revision(2, "a", Value::Int(1), 0, Action::Add),
            table_revision(1, "b", Value::Int(1), 0, Action::Add),
            table_revision(1, "a", Value::Int(2), 0, Action::Add),
            table_revision(1, "a", Value::Int(1), 1, Action::Add),
            table_revision(1, "a", Value::Int(1), 0, Action::Remove),
            table_revision(1, "a", Value::Int(1), 0, Action::Add),
        ];
        revisions.sort();
        let order: Vec<_> = revisions
            .iter()
            .map(|r| (r.locator().value(), r.key().as_str().to_string(), r.version(), r.action()))
            .collect();
        assert_eq!(order[0], (1, "a".to_string(), 0, Action::Add));
        assert_eq!(order[1], (1, "a".to_string(), 0, Action::Remove));
        assert_eq!(order[2], (1, "a".to_string(), 1, Action::Add));
        assert_eq!(order[3], (1, "a".to_string(), 0, Action::Add)); // value 2
        assert_eq!(order[4], (1, "b".to_string(), 0, Action::Add));
        assert_eq!(order[5], (2, "a".to_string(), 0, Action::Add));
    }

    #[test]
    fn test_streamed_decode() {
        let first = table_revision(1, "a", Value::Int(1), 0, Action::Add);
        let second = table_revision(2, "b", Value::from("text"), 1, Action::Add);
        let mut bytes = first.to_bytes().unwrap();
        bytes.extend(second.to_bytes().unwrap());

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(Revision::<TableFlavor>::read_next(&mut reader).unwrap(), first);
        assert_eq!(Revision::<TableFlavor>::read_next(&mut reader).unwrap(), second);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_invalid_action_rejected() {
        let mut bytes = table_revision(1, "a", Value::Int(1), 0, Action::Add).to_bytes().unwrap();
        bytes[8] = 7;
        assert!(Revision::<TableFlavor>::read_from(&bytes).is_err());
    }
}
