// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunks
//!
//! Append-only sorted revision containers. A chunk is born mutable, accepting
//! inserts into an in-memory sorted structure guarded by one reader-writer
//! lock, and is sealed exactly once by `transfer`, which renders the content
//! to an immutable file together with a [`Manifest`] and a Bloom filter.
//! Sealed chunks are memory-mapped and never rewritten; retiring them is the
//! engine's job and happens by atomically replacing the active set.

pub mod chunk;
pub mod manifest;
pub mod seek;
pub mod stats;

pub use chunk::Chunk;
pub use manifest::{Manifest, ManifestEntry};
pub use seek::{Accumulator, SeekKey};
pub use stats::ChunkStats;
