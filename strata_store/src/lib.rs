// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Strata Store
//!
//! The storage kernel of a versioned, schemaless record store. The kernel
//! converts a stream of logical writes into durable, searchable, time-indexed
//! byte structures and answers point, range, full-text, and historical reads
//! against them.
//!
//! ## Layers
//!
//! The kernel is layered leaves-first on top of the domain crate:
//!
//! - **infrastructure** - file-backed byte sinks, mapped reads, atomic
//!   replace, process locks, tracing setup
//! - **chunk** - append-only sorted revision containers with a manifest and
//!   a Bloom filter; mutable until sealed, immutable after
//! - **corpus** - the asynchronous substring deduplicator and indexer behind
//!   the full-text index
//! - **store** - the `Store` surface tying the three indexes together under
//!   one monotonic version counter
//!
//! ## Data Flow
//!
//! A write becomes three insertions (table, index, corpus chunk); each chunk
//! maintains an in-memory sorted structure and a Bloom filter. On `sync` the
//! open chunks render to files together with their manifests; subsequent
//! reads memory-map the files and seek via the manifest. Reads never mutate
//! chunks.
//!
//! ## Example
//!
//! ```no_run
//! use strata_store::config::StoreConfig;
//! use strata_store::store::Store;
//! use strata_store_domain::{Identifier, Text, Value};
//!
//! # fn main() -> Result<(), strata_store_domain::StoreError> {
//! let store = Store::open(StoreConfig::with_data_dir("/var/lib/strata"))?;
//! let field = Text::new("name");
//! store.add(&field, Value::from("lamport"), Identifier::new(1))?;
//! let values = store.select(&field, Identifier::new(1), None)?;
//! assert_eq!(values.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod infrastructure;
pub mod store;

pub use chunk::{Chunk, Manifest, SeekKey};
pub use config::StoreConfig;
pub use corpus::{CorpusIndexer, CountUpLatch};
pub use store::{Operator, Store};
