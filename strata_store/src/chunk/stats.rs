// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Read-path observability counters for a chunk.
//!
//! The counters are cheap relaxed atomics bumped on the read path; they feed
//! diagnostics and let tests assert structural behavior (a Bloom miss must
//! skip the manifest entirely).

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-chunk read statistics.
#[derive(Debug, Default)]
pub struct ChunkStats {
    bloom_skips: AtomicU64,
    revisions_decoded: AtomicU64,
}

impl ChunkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_bloom_skip(&self) {
        self.bloom_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self, count: u64) {
        self.revisions_decoded.fetch_add(count, Ordering::Relaxed);
    }

    /// Seeks answered negatively by the Bloom filter alone.
    pub fn bloom_skips(&self) -> u64 {
        self.bloom_skips.load(Ordering::Relaxed)
    }

    /// Revisions decoded from the mapped file across all seeks.
    pub fn revisions_decoded(&self) -> u64 {
        self.revisions_decoded.load(Ordering::Relaxed)
    }
}
