// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Composite Cache
//!
//! A best-effort interning cache for [`Composite`] construction, keyed by a
//! 32-bit non-cryptographic hash of the part array.
//!
//! This is deliberately a *distinct API* from [`Composite::of`], not a toggle
//! on it: a cache hit may collide, returning a Composite built from a
//! different part array that happened to share the 32-bit hash. Callers opt
//! in by calling [`CompositeCache::intern`] and must tolerate occasional
//! equal-hash-but-unequal keys; code whose correctness depends on exact
//! equality must use [`Composite::of`]. Callers must also not rely on
//! `parts()` being recoverable from a cache-returned instance.
//!
//! The cache is a process-scoped structure created at kernel init (it is a
//! field of the store) and torn down with it; it is never a global. Races
//! between concurrent interns may produce duplicate construction work but
//! never corruption.

use std::collections::HashMap;
use std::sync::RwLock;

use xxhash_rust::xxh32::Xxh32;

use crate::byteable::Byteable;
use crate::error::StoreError;
use crate::value_objects::Composite;

const PART_HASH_SEED: u32 = 0x5354_5241; // "STRA"

/// Best-effort, collision-tolerant Composite interning.
#[derive(Debug, Default)]
pub struct CompositeCache {
    entries: RwLock<HashMap<u32, Composite>>,
}

impl CompositeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached Composite for `parts`, constructing and caching one
    /// on a miss.
    ///
    /// Hits are matched on a 32-bit hash of the part array only; see the
    /// module documentation for the collision contract.
    pub fn intern(&self, parts: &[&dyn Byteable]) -> Result<Composite, StoreError> {
        let key = Self::hash_parts(parts)?;

        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(&key) {
                return Ok(hit.clone());
            }
        }

        let composite = Composite::of(parts)?;
        if let Ok(mut entries) = self.entries.write() {
            // A racing intern may have landed first; keep the existing entry
            // so repeated callers observe a stable instance.
            entries.entry(key).or_insert_with(|| composite.clone());
        }
        Ok(composite)
    }

    /// Number of cached composites.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn hash_parts(parts: &[&dyn Byteable]) -> Result<u32, StoreError> {
        let mut hasher = Xxh32::new(PART_HASH_SEED);
        for part in parts {
            let bytes = part.to_bytes()?;
            // Length-prefix each part so ["ab"] and ["a","b"] hash apart.
            hasher.update(&(bytes.len() as u32).to_be_bytes());
            hasher.update(&bytes);
        }
        Ok(hasher.digest())
    }
}
