// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # B+ Tree Deduplicator
//!
//! The last-resort variant for values whose substring expansion is too large
//! for the mapped set's budget. Substring content lives nowhere but the
//! parent text; the tree stores 32-bit hashes with byte-range values, so its
//! footprint is 12 bytes per distinct substring regardless of substring
//! length.
//!
//! A membership check is layered cheapest-first:
//!
//! 1. the Bloom filter - a miss is authoritative: the substring is new;
//! 2. the in-memory hash set of seen 32-bit hashes - absorbs spurious Bloom
//!    positives without touching disk;
//! 3. a linear scan of the B+ tree entries under that hash, comparing actual
//!    parent bytes - resolves genuine hash collisions exactly.

use std::collections::HashSet;

use xxhash_rust::xxh32::xxh32;

use strata_store_domain::{BloomFilter, StoreError, Text};

use crate::corpus::btree::DiskBTree;
use crate::corpus::dedup::{view_range, Deduplicator};

const HASH_SEED: u32 = 0x434F_5250; // "CORP"

/// Disk-backed deduplicator: Bloom filter + collision set + on-disk B+ tree.
pub struct BTreeDeduplicator {
    parent: Text,
    bloom: BloomFilter,
    seen_hashes: HashSet<u32>,
    tree: DiskBTree,
}

impl BTreeDeduplicator {
    pub fn new(parent: Text, expected_insertions: u64) -> Result<Self, StoreError> {
        let expected = expected_insertions.min(u32::MAX as u64) as u32;
        Ok(Self {
            parent,
            bloom: BloomFilter::with_expected_insertions(expected),
            seen_hashes: HashSet::new(),
            tree: DiskBTree::new()?,
        })
    }

    fn record(&mut self, hash: u32, start: u32, end: u32) -> Result<(), StoreError> {
        self.tree.insert(hash, (start, end))?;
        self.bloom.put_bytes(&hash.to_be_bytes());
        self.seen_hashes.insert(hash);
        Ok(())
    }
}

impl Deduplicator for BTreeDeduplicator {
    fn add(&mut self, substring: &Text) -> Result<bool, StoreError> {
        let (start, end) = view_range(&self.parent, substring)?;
        let needle = substring.as_str().as_bytes();
        let hash = xxh32(needle, HASH_SEED);

        if !self.bloom.might_contain_bytes(&hash.to_be_bytes()) {
            self.record(hash, start as u32, end as u32)?;
            return Ok(true);
        }
        if !self.seen_hashes.contains(&hash) {
            // Spurious Bloom positive; nothing under this hash yet.
            self.record(hash, start as u32, end as u32)?;
            return Ok(true);
        }

        let parent_bytes = self.parent.as_str().as_bytes();
        for (seen_start, seen_end) in self.tree.scan(hash)? {
            if &parent_bytes[seen_start as usize..seen_end as usize] == needle {
                return Ok(false);
            }
        }

        // A genuine 32-bit collision between distinct substrings.
        self.record(hash, start as u32, end as u32)?;
        Ok(true)
    }
}
