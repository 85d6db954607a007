// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Seek Keys and Accumulators
//!
//! A seek addresses a chunk at one of three granularities - locator,
//! locator+key, or the exact triple - and folds matching revisions into an
//! [`Accumulator`] under toggle semantics: each matching revision flips the
//! presence of its `(key, value)` pair, so a binding is present in the final
//! result iff it was toggled an odd number of times. Toggling is commutative
//! across chunks, which is what lets the store merge sealed and open chunks
//! without coordinating their seek order.

use std::collections::BTreeSet;

use strata_store_domain::{ChunkFlavor, Composite, Revision, StoreError};

/// A chunk query at one of the three addressing granularities.
#[derive(Debug, Clone)]
pub enum SeekKey<F: ChunkFlavor> {
    Locator(F::Locator),
    LocatorKey(F::Locator, F::Key),
    Exact(F::Locator, F::Key, F::Value),
}

impl<F: ChunkFlavor> SeekKey<F> {
    /// The composite at this key's own granularity, used against the Bloom
    /// filter (which binds every granularity of every inserted revision).
    pub fn composite(&self) -> Result<Composite, StoreError> {
        match self {
            SeekKey::Locator(l) => Composite::of(&[l]),
            SeekKey::LocatorKey(l, k) => Composite::of(&[l, k]),
            SeekKey::Exact(l, k, v) => Composite::of(&[l, k, v]),
        }
    }

    /// The composite used against the manifest: the locator level for
    /// locator seeks, the finer locator+key level otherwise.
    pub fn manifest_composite(&self) -> Result<Composite, StoreError> {
        match self {
            SeekKey::Locator(l) => Composite::of(&[l]),
            SeekKey::LocatorKey(l, k) | SeekKey::Exact(l, k, _) => Composite::of(&[l, k]),
        }
    }

    /// Whether `revision` falls under this key's prefix.
    pub fn matches(&self, revision: &Revision<F>) -> bool {
        match self {
            SeekKey::Locator(l) => revision.locator() == l,
            SeekKey::LocatorKey(l, k) => revision.locator() == l && revision.key() == k,
            SeekKey::Exact(l, k, v) => revision.locator() == l && revision.key() == k && revision.value() == v,
        }
    }
}

/// Toggle-applying collector of present `(key, value)` bindings.
#[derive(Debug)]
pub struct Accumulator<F: ChunkFlavor> {
    present: BTreeSet<(F::Key, F::Value)>,
}

impl<F: ChunkFlavor> Accumulator<F> {
    pub fn new() -> Self {
        Self {
            present: BTreeSet::new(),
        }
    }

    /// Flips the presence of the revision's binding.
    pub fn toggle(&mut self, revision: &Revision<F>) {
        let binding = (revision.key().clone(), revision.value().clone());
        if !self.present.remove(&binding) {
            self.present.insert(binding);
        }
    }

    /// The bindings present after all toggles.
    pub fn bindings(&self) -> &BTreeSet<(F::Key, F::Value)> {
        &self.present
    }

    /// The distinct present values, discarding keys.
    pub fn values(&self) -> BTreeSet<F::Value> {
        self.present.iter().map(|(_, value)| value.clone()).collect()
    }

    /// The distinct present keys, discarding values.
    pub fn keys(&self) -> BTreeSet<F::Key> {
        self.present.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }
}

impl<F: ChunkFlavor> Default for Accumulator<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store_domain::{Action, Identifier, TableFlavor, Text, Value};

    fn revision(record: u64, field: &str, value: Value, version: u64, action: Action) -> Revision<TableFlavor> {
        Revision::new(Identifier::new(record), Text::new(field), value, version, action)
    }

    #[test]
    fn test_toggle_parity() {
        let mut acc: Accumulator<TableFlavor> = Accumulator::new();
        let add = revision(1, "age", Value::Int(30), 0, Action::Add);
        let remove = revision(1, "age", Value::Int(30), 1, Action::Remove);

        acc.toggle(&add);
        assert_eq!(acc.len(), 1);
        acc.toggle(&remove);
        assert!(acc.is_empty());
        acc.toggle(&add);
        assert_eq!(acc.values().len(), 1);
    }

    #[test]
    fn test_match_granularities() {
        let rev = revision(1, "age", Value::Int(30), 0, Action::Add);

        let by_locator: SeekKey<TableFlavor> = SeekKey::Locator(Identifier::new(1));
        let by_key: SeekKey<TableFlavor> = SeekKey::LocatorKey(Identifier::new(1), Text::new("age"));
        let exact: SeekKey<TableFlavor> = SeekKey::Exact(Identifier::new(1), Text::new("age"), Value::Int(30));
        let miss: SeekKey<TableFlavor> = SeekKey::LocatorKey(Identifier::new(1), Text::new("name"));

        assert!(by_locator.matches(&rev));
        assert!(by_key.matches(&rev));
        assert!(exact.matches(&rev));
        assert!(!miss.matches(&rev));
    }

    #[test]
    fn test_manifest_composite_granularity() {
        let exact: SeekKey<TableFlavor> = SeekKey::Exact(Identifier::new(1), Text::new("age"), Value::Int(30));
        let by_key: SeekKey<TableFlavor> = SeekKey::LocatorKey(Identifier::new(1), Text::new("age"));
        // Exact seeks address the manifest at the locator+key level.
        assert_eq!(
            exact.manifest_composite().unwrap(),
            by_key.manifest_composite().unwrap()
        );
    }
}
