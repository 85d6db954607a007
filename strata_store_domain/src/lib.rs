// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Strata Store Domain
//!
//! The domain layer of the Strata storage kernel: the pure, infrastructure-free
//! core of a versioned, schemaless record store. Everything here is a value
//! type or a trait seam; nothing touches the filesystem, spawns threads, or
//! logs.
//!
//! ## Module Structure
//!
//! - [`byteable`] - the uniform, order-preserving binary encoding contract
//!   ([`Byteable`], [`FromBytes`]) and the sink/source family used by every
//!   on-disk entity
//! - [`value_objects`] - the primitive entities ([`Identifier`], [`Text`],
//!   [`Value`], [`Position`]), multi-part [`Composite`] keys, and the
//!   [`Revision`] change record with its three chunk flavors
//! - [`bloom`] - the persistent approximate-membership filter that lets the
//!   kernel skip chunks that definitely do not contain a key
//! - [`services`] - the trait surface exposed to the engine layer
//!   ([`Gatherable`], [`SearchIndex`], [`Syncable`])
//! - [`error`] - the [`StoreError`] hierarchy shared by every layer
//!
//! ## Domain Concepts
//!
//! ### Byteables
//! Any entity that declares its encoded size, serializes itself
//! deterministically into a [`byteable::ByteSink`], and reconstructs from a
//! byte window that exactly covers one instance. Equal entities produce
//! identical canonical bytes.
//!
//! ### Revisions
//! The unit of durable change: `(locator, key, value, version, action)`. A
//! logical binding is present at time `t` iff it has been toggled an odd
//! number of times by revisions with version <= `t`.
//!
//! ### Composites
//! Ordered tuples of Byteables encoded into at most
//! [`value_objects::MAX_COMPOSITE_SIZE`] bytes, falling back to a SHA-256
//! digest of the same encoding when longer. Composites key the Bloom filters
//! and the chunk manifests.

pub mod bloom;
pub mod byteable;
pub mod error;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
// These exports provide a clean API surface for consumers of the domain layer
pub use bloom::BloomFilter;
pub use byteable::{ByteReader, ByteSink, Byteable, FromBytes, HashSink, HeapSink, NullSink, SliceSink};
pub use error::StoreError;
pub use services::{Gatherable, SearchIndex, Syncable};
pub use value_objects::{
    Action, ChunkFlavor, Composite, CompositeCache, CorpusFlavor, Identifier, IndexFlavor, Position, Revision,
    TableFlavor, Text, Value, MAX_COMPOSITE_SIZE,
};
