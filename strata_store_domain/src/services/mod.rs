// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Surface Traits
//!
//! The trait seams the kernel exposes to the engine layer above it. The
//! traits live in the domain crate; the kernel crate provides the
//! implementations, mirroring the ports-and-adapters split of the rest of the
//! codebase.
//!
//! - [`Gatherable`] - unordered reads of a record's field values
//! - [`SearchIndex`] - asynchronous full-text indexing, completion observable
//!   via a count-up latch owned by the caller
//! - [`Syncable`] - flush and fsync all pending state

use std::collections::{BTreeSet, HashSet};

use crate::error::StoreError;
use crate::value_objects::{Action, Identifier, Position, Text, Value};

/// Point reads of a record's field, unordered.
pub trait Gatherable {
    /// The values bound to `field` on `record` at `at` (latest when `None`),
    /// in value order.
    fn select(&self, field: &Text, record: Identifier, at: Option<u64>) -> Result<BTreeSet<Value>, StoreError>;

    /// Identical result set to [`Gatherable::select`], but returned in hash
    /// order. The default implementation delegates to `select`.
    fn gather(&self, field: &Text, record: Identifier, at: Option<u64>) -> Result<HashSet<Value>, StoreError> {
        Ok(self.select(field, record, at)?.into_iter().collect())
    }
}

/// Asynchronous full-text indexing.
///
/// `index` enqueues work and returns; the implementation increments the
/// caller-supplied latch once the term's substrings have been inserted, so a
/// caller that submitted `n` index operations observes completion by awaiting
/// a latch count of `n`.
pub trait SearchIndex {
    fn index(
        &self,
        field: Text,
        term: Text,
        position: Position,
        version: u64,
        action: Action,
    ) -> Result<(), StoreError>;
}

/// Durability boundary: flush and fsync all pending state for the callee.
pub trait Syncable {
    fn sync(&self) -> Result<(), StoreError>;
}
