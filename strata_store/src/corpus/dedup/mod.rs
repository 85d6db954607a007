// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Substring Deduplicators
//!
//! A long string value expands to O(n^2) substrings; the deduplicator is what
//! keeps that expansion from flooding the corpus chunk or exhausting memory.
//! Its contract: [`Deduplicator::add`] returns true exactly when the
//! substring has not previously been added for the current value.
//!
//! Three implementations are chosen adaptively per value:
//!
//! 1. [`BruteForceDeduplicator`] - no auxiliary memory. Relies on depth-first
//!    left-to-right enumeration: a substring is new iff no identical run
//!    begins at any earlier position in the parent.
//! 2. [`MappedSetDeduplicator`] - an open-addressed hash set in a
//!    tempfile-backed memory map. Expected O(1) per add; chosen when the
//!    off-heap budget covers the estimated footprint.
//! 3. [`BTreeDeduplicator`] - the last resort for very long values: an
//!    on-disk B+ tree keyed by substring hash, fronted by a Bloom filter and
//!    an in-memory hash set that absorbs spurious Bloom positives.
//!
//! A `CapacityError` from a stronger variant degrades to brute force
//! mid-value without losing state: brute force re-derives "seen before" from
//! the parent text itself, so the switch is correct at any point of the
//! enumeration. Instances are single-owner; each indexing task builds its
//! own.

pub mod brute;
pub mod btree_dedup;
pub mod mapped_set;

pub use brute::BruteForceDeduplicator;
pub use btree_dedup::BTreeDeduplicator;
pub use mapped_set::MappedSetDeduplicator;

use tracing::{debug, warn};

use strata_store_domain::{StoreError, Text};

use crate::config::CorpusConfig;

/// Per-value filter admitting each distinct substring exactly once.
pub trait Deduplicator: Send {
    /// True iff `substring` has not been added before for the current value.
    ///
    /// `substring` must be a view into the parent text the deduplicator was
    /// built for.
    fn add(&mut self, substring: &Text) -> Result<bool, StoreError>;
}

/// Which concrete deduplicator is in use; exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKind {
    BruteForce,
    MappedSet,
    BTree,
}

/// The adaptively chosen deduplicator, with the documented capacity-fallback
/// path: a `CapacityError` from the inner variant swaps in brute force and
/// retries, once.
pub struct AdaptiveDeduplicator {
    inner: Box<dyn Deduplicator>,
    kind: DedupKind,
    parent: Text,
    degraded: bool,
}

impl AdaptiveDeduplicator {
    /// Chooses an implementation for `parent` under `config`.
    pub fn pick(parent: &Text, config: &CorpusConfig) -> Result<Self, StoreError> {
        let char_count = parent.as_str().chars().count() as u64;
        let (inner, kind): (Box<dyn Deduplicator>, DedupKind) = if char_count <= config.brute_force_threshold as u64 {
            (Box::new(BruteForceDeduplicator::new(parent.clone())), DedupKind::BruteForce)
        } else {
            let expected = expected_insertions(char_count, config.max_substring_len as u64);
            let footprint = expected.saturating_mul(config.avg_substring_len as u64);
            if footprint <= config.dedup_off_heap_budget {
                (
                    Box::new(MappedSetDeduplicator::new(parent.clone(), expected)?),
                    DedupKind::MappedSet,
                )
            } else {
                (
                    Box::new(BTreeDeduplicator::new(parent.clone(), expected)?),
                    DedupKind::BTree,
                )
            }
        };
        debug!(kind = ?kind, chars = char_count, "deduplicator selected");
        Ok(Self {
            inner,
            kind,
            parent: parent.clone(),
            degraded: false,
        })
    }

    pub fn kind(&self) -> DedupKind {
        self.kind
    }

    /// True once the capacity fallback has engaged.
    pub fn degraded(&self) -> bool {
        self.degraded
    }
}

/// Byte range of `substring` relative to `parent`, verifying that it really
/// is a view into the same backing buffer.
pub(crate) fn view_range(parent: &Text, substring: &Text) -> Result<(usize, usize), StoreError> {
    let (parent_buf, parent_start, parent_end) = parent.backing();
    let (sub_buf, sub_start, sub_end) = substring.backing();
    if !std::sync::Arc::ptr_eq(parent_buf, sub_buf) || sub_start < parent_start || sub_end > parent_end {
        return Err(StoreError::internal_error(
            "substring is not a view into the deduplicator's parent text",
        ));
    }
    Ok((sub_start - parent_start, sub_end - parent_start))
}

/// Upper estimate of distinct substring insertions for a value of
/// `char_count` characters under a length cap (0 = uncapped).
fn expected_insertions(char_count: u64, max_substring_len: u64) -> u64 {
    if max_substring_len == 0 {
        char_count.saturating_mul(char_count + 1) / 2
    } else {
        char_count.saturating_mul(max_substring_len.min(char_count))
    }
}

impl Deduplicator for AdaptiveDeduplicator {
    fn add(&mut self, substring: &Text) -> Result<bool, StoreError> {
        match self.inner.add(substring) {
            Err(StoreError::CapacityError(reason)) if !self.degraded => {
                warn!(
                    kind = ?self.kind,
                    reason = %reason,
                    "deduplicator exhausted its capacity; falling back to brute force"
                );
                self.inner = Box::new(BruteForceDeduplicator::new(self.parent.clone()));
                self.kind = DedupKind::BruteForce;
                self.degraded = true;
                self.inner.add(substring)
            }
            outcome => outcome,
        }
    }
}
