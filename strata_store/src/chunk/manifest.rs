// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Manifest
//!
//! The mapping from a [`Composite`] to the byte range its revisions occupy in
//! a sealed chunk file. Every locator gets an entry covering its whole
//! contiguous run, and every `(locator, key)` prefix gets a finer entry for
//! tighter seeks; the two levels coexist in one sorted sequence because a
//! locator-only composite encoding is a strict prefix of (and therefore sorts
//! before) the locator+key encodings for the same locator.
//!
//! ## Wire Form
//!
//! ```text
//! manifest := entry*
//! entry := composite_len(4) composite_bytes start(8) end(8)
//! ```
//!
//! Entries ascend lexicographically by `composite_bytes`; `end` is exclusive.
//!
//! ## Instrumentation
//!
//! The manifest counts its lookups. The Bloom filter in front of it must
//! short-circuit absent keys, so "a seek for an absent locator performed zero
//! manifest lookups" is an assertable property rather than a hope.

use std::sync::atomic::{AtomicU64, Ordering};

use strata_store_domain::{ByteReader, ByteSink, Composite, StoreError};

/// One byte-range entry of a [`Manifest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    composite: Composite,
    start: u64,
    end: u64,
}

impl ManifestEntry {
    pub fn new(composite: Composite, start: u64, end: u64) -> Self {
        Self { composite, start, end }
    }

    pub fn composite(&self) -> &Composite {
        &self.composite
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.end
    }
}

/// Sorted Composite-to-byte-range index over one sealed chunk file.
#[derive(Debug)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    lookups: AtomicU64,
}

impl Manifest {
    /// Builds a manifest, sorting entries by composite bytes.
    pub fn new(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.composite.as_bytes().cmp(b.composite.as_bytes()));
        Self {
            entries,
            lookups: AtomicU64::new(0),
        }
    }

    /// Binary-searches for the byte range of `composite`.
    pub fn lookup(&self, composite: &Composite) -> Option<(u64, u64)> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.entries
            .binary_search_by(|entry| entry.composite.as_bytes().cmp(composite.as_bytes()))
            .ok()
            .map(|index| (self.entries[index].start, self.entries[index].end))
    }

    /// Lookups performed since construction or load.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Serializes all entries in sorted order.
    pub fn write_to(&self, sink: &mut dyn ByteSink) -> Result<(), StoreError> {
        for entry in &self.entries {
            sink.put_u32(entry.composite.as_bytes().len() as u32)?;
            sink.put_slice(entry.composite.as_bytes())?;
            sink.put_u64(entry.start)?;
            sink.put_u64(entry.end)?;
        }
        Ok(())
    }

    /// Restores a manifest, verifying sort order and range sanity.
    pub fn load(bytes: &[u8]) -> Result<Self, StoreError> {
        let mut reader = ByteReader::new(bytes);
        let mut entries: Vec<ManifestEntry> = Vec::new();
        while !reader.is_empty() {
            let len = reader.get_u32()? as usize;
            let composite = Composite::load(reader.take(len)?)?;
            let start = reader.get_u64()?;
            let end = reader.get_u64()?;
            if end < start {
                return Err(StoreError::decode_error(format!(
                    "manifest range {}..{} is inverted",
                    start, end
                )));
            }
            if let Some(previous) = entries.last() {
                if previous.composite.as_bytes() >= composite.as_bytes() {
                    return Err(StoreError::decode_error("manifest entries are not strictly ascending"));
                }
            }
            entries.push(ManifestEntry::new(composite, start, end));
        }
        Ok(Self {
            entries,
            lookups: AtomicU64::new(0),
        })
    }
}
