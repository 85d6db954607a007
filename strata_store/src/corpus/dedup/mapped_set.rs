// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mapped-Set Deduplicator
//!
//! An open-addressed hash set living in a tempfile-backed memory map, so the
//! working set is off-heap and reclaimed wholesale when the value finishes
//! indexing. Each slot stores `(hash64, start, end)` - 16 bytes - where the
//! range points back into the parent text; membership checks re-compare the
//! actual substring bytes, so hash collisions are resolved exactly.
//!
//! Saturation (load factor or probe limit) is a `CapacityError`, which the
//! adaptive wrapper answers by degrading to brute force.

use memmap2::MmapMut;
use xxhash_rust::xxh3::xxh3_64;

use strata_store_domain::{StoreError, Text};

use crate::corpus::dedup::{view_range, Deduplicator};

const SLOT_SIZE: usize = 16;
const MIN_SLOTS: u64 = 1024;
const MAX_PROBES: usize = 128;

/// Off-heap hash set of substrings, keyed by content.
pub struct MappedSetDeduplicator {
    parent: Text,
    map: MmapMut,
    mask: usize,
    len: usize,
    max_len: usize,
}

impl MappedSetDeduplicator {
    /// Builds a set sized for `expected_insertions` distinct substrings.
    pub fn new(parent: Text, expected_insertions: u64) -> Result<Self, StoreError> {
        // Size for a 70% target load factor, rounded to a power of two.
        let slots = (expected_insertions.saturating_mul(10) / 7)
            .max(MIN_SLOTS)
            .next_power_of_two();
        let file = tempfile::tempfile()
            .map_err(|e| StoreError::io_error(format!("failed to create deduplicator scratch file: {}", e)))?;
        file.set_len(slots * SLOT_SIZE as u64)
            .map_err(|e| StoreError::io_error(format!("failed to size deduplicator scratch file: {}", e)))?;
        let map = unsafe {
            MmapMut::map_mut(&file)
                .map_err(|e| StoreError::io_error(format!("failed to map deduplicator scratch file: {}", e)))?
        };
        Ok(Self {
            parent,
            map,
            mask: (slots - 1) as usize,
            len: 0,
            max_len: (slots as usize) * 85 / 100,
        })
    }

    fn slot(&self, index: usize) -> (u64, u32, u32) {
        let base = index * SLOT_SIZE;
        let hash = u64::from_be_bytes(self.map[base..base + 8].try_into().unwrap_or([0; 8]));
        let start = u32::from_be_bytes(self.map[base + 8..base + 12].try_into().unwrap_or([0; 4]));
        let end = u32::from_be_bytes(self.map[base + 12..base + 16].try_into().unwrap_or([0; 4]));
        (hash, start, end)
    }

    fn write_slot(&mut self, index: usize, hash: u64, start: u32, end: u32) {
        let base = index * SLOT_SIZE;
        self.map[base..base + 8].copy_from_slice(&hash.to_be_bytes());
        self.map[base + 8..base + 12].copy_from_slice(&start.to_be_bytes());
        self.map[base + 12..base + 16].copy_from_slice(&end.to_be_bytes());
    }
}

impl Deduplicator for MappedSetDeduplicator {
    fn add(&mut self, substring: &Text) -> Result<bool, StoreError> {
        let (start, end) = view_range(&self.parent, substring)?;
        let needle = substring.as_str().as_bytes();
        let parent_bytes = self.parent.as_str().as_bytes();
        let hash = xxh3_64(needle);

        let mut index = (hash as usize) & self.mask;
        for _ in 0..MAX_PROBES {
            let (slot_hash, slot_start, slot_end) = self.slot(index);
            if slot_end == 0 {
                // Empty slot: the substring is new. A non-empty substring
                // always has end >= 1, so end == 0 is unambiguous.
                if self.len + 1 > self.max_len {
                    return Err(StoreError::capacity_error(format!(
                        "mapped set reached its load limit of {} entries",
                        self.max_len
                    )));
                }
                self.write_slot(index, hash, start as u32, end as u32);
                self.len += 1;
                return Ok(true);
            }
            if slot_hash == hash && &parent_bytes[slot_start as usize..slot_end as usize] == needle {
                return Ok(false);
            }
            index = (index + 1) & self.mask;
        }
        Err(StoreError::capacity_error(format!(
            "mapped set exceeded {} probes",
            MAX_PROBES
        )))
    }
}
