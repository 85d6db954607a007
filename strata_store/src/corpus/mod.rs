// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Corpus Indexing Pipeline
//!
//! Turns a string value into a bounded set of searchable positions without
//! materializing its O(n^2) substring expansion in memory: enumeration is
//! streamed, deduplication is adaptive (in-place, off-heap, or on-disk), and
//! insertion happens on a fixed worker pool whose completion the caller
//! observes through a count-up latch.

pub mod btree;
pub mod dedup;
pub mod indexer;
pub mod latch;
pub mod substrings;

pub use dedup::{
    AdaptiveDeduplicator, BTreeDeduplicator, BruteForceDeduplicator, DedupKind, Deduplicator, MappedSetDeduplicator,
};
pub use indexer::{CorpusIndexer, IndexTask};
pub use latch::CountUpLatch;
