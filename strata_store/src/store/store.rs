// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store
//!
//! The kernel's write/read surface over one data directory. A [`Store`] owns:
//!
//! - the three active chunks (table, index, corpus) plus any sealed
//!   predecessors loaded from disk,
//! - the monotonic version counter (unique across everything this instance
//!   produces),
//! - the composite cache (process-scoped, created here, torn down here),
//! - the corpus indexer pool and the latch that tracks its completion,
//! - the exclusive process lock on the data directory.
//!
//! ## Write Path
//!
//! `add`/`remove` are toggle-aware: an add succeeds only when the binding is
//! currently absent, a remove only when present. A successful write stamps a
//! fresh version and inserts one revision into the table and index chunks
//! synchronously; string values additionally enqueue an asynchronous corpus
//! indexing task.
//!
//! ## Read Path
//!
//! Reads merge every chunk, oldest first, into one toggle accumulator -
//! parity composes across chunks, so the merge needs no coordination beyond
//! chunk order. Historical reads pass `at`: only revisions with version
//! `<= at` participate.
//!
//! ## Durability
//!
//! `sync` (via [`Syncable`]) drains the indexing latch, surfaces any recorded indexing
//! failures, transfers each non-empty open chunk to disk, and fsyncs the data
//! directory. When to call it is the engine's decision.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use strata_store_domain::{
    Action, ChunkFlavor, Composite, CompositeCache, CorpusFlavor, Gatherable, Identifier, IndexFlavor, Position,
    Revision, SearchIndex, StoreError, Syncable, TableFlavor, Text, Value,
};

use crate::chunk::{Accumulator, Chunk, SeekKey};
use crate::config::{BloomConfig, StoreConfig};
use crate::corpus::{CorpusIndexer, CountUpLatch, IndexTask};
use crate::infrastructure::filesystem::{self, ProcessLock};

const LOCK_FILE: &str = ".lock";

/// A comparison against the value index.
#[derive(Debug, Clone)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Inclusive lower bound, exclusive upper bound.
    Between(Value, Value),
}

impl Operator {
    /// Whether `candidate` satisfies this comparison.
    pub fn matches(&self, candidate: &Value) -> bool {
        match self {
            Operator::Eq(operand) => candidate == operand,
            Operator::Ne(operand) => candidate != operand,
            Operator::Gt(operand) => candidate > operand,
            Operator::Gte(operand) => candidate >= operand,
            Operator::Lt(operand) => candidate < operand,
            Operator::Lte(operand) => candidate <= operand,
            Operator::Between(low, high) => candidate >= low && candidate < high,
        }
    }
}

/// The active and sealed chunks of one flavor, oldest first. The last chunk
/// is always the open one; the vector lock also serializes rotation against
/// in-flight inserts.
struct ChunkSet<F: ChunkFlavor> {
    chunks: RwLock<Vec<Arc<Chunk<F>>>>,
}

impl<F: ChunkFlavor> ChunkSet<F> {
    /// Loads the sealed chunks of this flavor from `dir` in sequence order
    /// and appends a fresh open chunk. Returns the set and the highest file
    /// sequence seen.
    fn load(dir: &Path, bloom: &BloomConfig) -> Result<(Self, u64), StoreError> {
        let mut sealed: Vec<(u64, PathBuf)> = Vec::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| StoreError::io_error(format!("failed to list {}: {}", dir.display(), e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_error(format!("failed to list {}: {}", dir.display(), e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("chunk") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(sequence) = stem
                .strip_prefix(F::NAME)
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(|rest| rest.parse::<u64>().ok())
            else {
                continue;
            };
            sealed.push((sequence, path));
        }
        sealed.sort_by_key(|(sequence, _)| *sequence);

        let mut max_sequence = 0;
        let mut chunks: Vec<Arc<Chunk<F>>> = Vec::with_capacity(sealed.len() + 1);
        for (sequence, path) in sealed {
            chunks.push(Arc::new(Chunk::load_sealed(&path)?));
            max_sequence = max_sequence.max(sequence);
        }
        chunks.push(Arc::new(Chunk::open(bloom)));
        Ok((
            Self {
                chunks: RwLock::new(chunks),
            },
            max_sequence,
        ))
    }

    /// The currently open chunk.
    fn open_chunk(&self) -> Arc<Chunk<F>> {
        let chunks = self.chunks.read();
        Arc::clone(chunks.last().expect("chunk set always holds an open chunk"))
    }

    /// Inserts while holding the set lock, so rotation cannot seal the open
    /// chunk out from under the write.
    fn insert(&self, revision: Revision<F>) -> Result<(), StoreError> {
        let chunks = self.chunks.read();
        chunks
            .last()
            .expect("chunk set always holds an open chunk")
            .insert(revision)
    }

    /// Folds all chunks, oldest first, into `acc`.
    fn seek(&self, key: &SeekKey<F>, up_to: u64, acc: &mut Accumulator<F>) -> Result<(), StoreError> {
        let chunks = self.chunks.read();
        for chunk in chunks.iter() {
            chunk.seek(key, up_to, acc)?;
        }
        Ok(())
    }

    fn open_len(&self) -> usize {
        self.open_chunk().len()
    }

    fn max_version(&self) -> u64 {
        let chunks = self.chunks.read();
        chunks.iter().map(|chunk| chunk.max_version()).max().unwrap_or(0)
    }

    /// Transfers the open chunk to `data_path` and pushes a fresh open
    /// chunk. No-op when the open chunk is empty.
    fn rotate(&self, data_path: &Path, bloom: &BloomConfig) -> Result<bool, StoreError> {
        let mut chunks = self.chunks.write();
        let open = Arc::clone(chunks.last().expect("chunk set always holds an open chunk"));
        if open.is_empty() {
            return Ok(false);
        }
        open.transfer(data_path)?;
        chunks.push(Arc::new(Chunk::open(bloom)));
        Ok(true)
    }
}

/// The storage kernel's surface over one data directory.
pub struct Store {
    config: StoreConfig,
    version: AtomicU64,
    sequence: AtomicU64,
    table: ChunkSet<TableFlavor>,
    index: ChunkSet<IndexFlavor>,
    corpus: ChunkSet<CorpusFlavor>,
    cache: CompositeCache,
    indexer: CorpusIndexer,
    latch: Arc<CountUpLatch>,
    submitted: AtomicU64,
    _lock: ProcessLock,
}

impl Store {
    /// Opens (or creates) a store at `config.data_dir`, loading any sealed
    /// chunks already present and resuming the version counter above
    /// everything they contain.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| StoreError::io_error(format!("failed to create {}: {}", config.data_dir.display(), e)))?;
        let lock = ProcessLock::acquire(&config.data_dir.join(LOCK_FILE))?;

        let (table, table_seq) = ChunkSet::load(&config.data_dir, &config.bloom)?;
        let (index, index_seq) = ChunkSet::load(&config.data_dir, &config.bloom)?;
        let (corpus, corpus_seq) = ChunkSet::load(&config.data_dir, &config.bloom)?;
        let max_sequence = table_seq.max(index_seq).max(corpus_seq);
        let max_version = table.max_version().max(index.max_version()).max(corpus.max_version());

        let indexer = CorpusIndexer::new(&config.corpus)?;
        info!(
            data_dir = %config.data_dir.display(),
            resume_version = max_version + 1,
            "store opened"
        );

        Ok(Self {
            config,
            version: AtomicU64::new(max_version + 1),
            sequence: AtomicU64::new(max_sequence + 1),
            table,
            index,
            corpus,
            cache: CompositeCache::new(),
            indexer,
            latch: Arc::new(CountUpLatch::new()),
            submitted: AtomicU64::new(0),
            _lock: lock,
        })
    }

    /// Binds `value` to `field` on `record`. Returns false when the binding
    /// is already present.
    pub fn add(&self, field: &Text, value: Value, record: Identifier) -> Result<bool, StoreError> {
        self.write(field, value, record, Action::Add)
    }

    /// Unbinds `value` from `field` on `record`. Returns false when the
    /// binding is absent.
    pub fn remove(&self, field: &Text, value: Value, record: Identifier) -> Result<bool, StoreError> {
        self.write(field, value, record, Action::Remove)
    }

    fn write(&self, field: &Text, value: Value, record: Identifier, action: Action) -> Result<bool, StoreError> {
        let value = value.optimize();
        let present = self.verify(field, &value, record, None)?;
        let applies = match action {
            Action::Add => !present,
            Action::Remove => present,
        };
        if !applies {
            debug!(%field, %record, %action, "write is a no-op at the current state");
            return Ok(false);
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst);
        self.table
            .insert(Revision::new(record, field.clone(), value.clone(), version, action))?;
        self.index
            .insert(Revision::new(field.clone(), value.clone(), record, version, action))?;
        if let Some(term) = value.as_text() {
            self.index_term(field.clone(), term.clone(), Position::new(record, 0), version, action)?;
        }
        Ok(true)
    }

    /// The values bound to `field` on `record` at `at` (latest when `None`).
    pub fn select(&self, field: &Text, record: Identifier, at: Option<u64>) -> Result<BTreeSet<Value>, StoreError> {
        let mut acc = Accumulator::new();
        self.table.seek(
            &SeekKey::LocatorKey(record, field.clone()),
            at.unwrap_or(u64::MAX),
            &mut acc,
        )?;
        Ok(acc.values())
    }

    /// The fields holding any value on `record` at `at`.
    pub fn describe(&self, record: Identifier, at: Option<u64>) -> Result<BTreeSet<Text>, StoreError> {
        let mut acc = Accumulator::new();
        self.table
            .seek(&SeekKey::Locator(record), at.unwrap_or(u64::MAX), &mut acc)?;
        Ok(acc.keys())
    }

    /// Whether `value` is bound to `field` on `record` at `at`.
    pub fn verify(&self, field: &Text, value: &Value, record: Identifier, at: Option<u64>) -> Result<bool, StoreError> {
        let mut acc = Accumulator::new();
        self.table.seek(
            &SeekKey::Exact(record, field.clone(), value.clone().optimize()),
            at.unwrap_or(u64::MAX),
            &mut acc,
        )?;
        Ok(!acc.is_empty())
    }

    /// The records whose `field` satisfies `op` at `at`.
    pub fn find(&self, field: &Text, op: &Operator, at: Option<u64>) -> Result<BTreeSet<Identifier>, StoreError> {
        let mut acc: Accumulator<IndexFlavor> = Accumulator::new();
        self.index
            .seek(&SeekKey::Locator(field.clone()), at.unwrap_or(u64::MAX), &mut acc)?;
        Ok(acc
            .bindings()
            .iter()
            .filter(|(value, _)| op.matches(value))
            .map(|(_, record)| *record)
            .collect())
    }

    /// The records whose `field` contains the term `query`. Drains pending
    /// indexing first, so everything submitted before the call is visible.
    pub fn search(&self, field: &Text, query: &Text) -> Result<BTreeSet<Identifier>, StoreError> {
        self.latch.await_count(self.submitted.load(Ordering::SeqCst));
        let mut acc: Accumulator<CorpusFlavor> = Accumulator::new();
        self.corpus
            .seek(&SeekKey::LocatorKey(field.clone(), query.clone()), u64::MAX, &mut acc)?;
        Ok(acc.values().into_iter().map(|position| position.record()).collect())
    }

    /// The positions at which `query` occurs under `field`, for callers that
    /// need offsets rather than records.
    pub fn positions(&self, field: &Text, query: &Text) -> Result<BTreeSet<Position>, StoreError> {
        self.latch.await_count(self.submitted.load(Ordering::SeqCst));
        let mut acc: Accumulator<CorpusFlavor> = Accumulator::new();
        self.corpus
            .seek(&SeekKey::LocatorKey(field.clone(), query.clone()), u64::MAX, &mut acc)?;
        Ok(acc.values())
    }

    /// The collision-tolerant composite cache scoped to this kernel
    /// instance. See [`CompositeCache`] for the contract; exact-equality
    /// paths inside the kernel never consult it.
    pub fn composite_cache(&self) -> &CompositeCache {
        &self.cache
    }

    /// Builds the exact composite addressing `field` on `record`, as used by
    /// the table index.
    pub fn record_composite(&self, field: &Text, record: Identifier) -> Result<Composite, StoreError> {
        Composite::of(&[&record, field])
    }

    /// The version the next write will be stamped with.
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Pending (unsealed) revisions across the three open chunks.
    pub fn pending_revisions(&self) -> usize {
        self.table.open_len() + self.index.open_len() + self.corpus.open_len()
    }

    fn index_term(
        &self,
        field: Text,
        term: Text,
        position: Position,
        version: u64,
        action: Action,
    ) -> Result<(), StoreError> {
        self.indexer.submit(IndexTask::new(
            self.corpus.open_chunk(),
            Arc::clone(&self.latch),
            field,
            term,
            position,
            version,
            action,
        ))?;
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rotate_all(&self) -> Result<(), StoreError> {
        let mut rotated = false;
        if self.table.open_len() > 0 {
            let path = self.next_chunk_path(TableFlavor::NAME);
            rotated |= self.table.rotate(&path, &self.config.bloom)?;
        }
        if self.index.open_len() > 0 {
            let path = self.next_chunk_path(IndexFlavor::NAME);
            rotated |= self.index.rotate(&path, &self.config.bloom)?;
        }
        if self.corpus.open_len() > 0 {
            let path = self.next_chunk_path(CorpusFlavor::NAME);
            rotated |= self.corpus.rotate(&path, &self.config.bloom)?;
        }
        if rotated {
            filesystem::fsync_dir(&self.config.data_dir)?;
        }
        Ok(())
    }

    fn next_chunk_path(&self, flavor: &str) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.config.data_dir.join(format!("{}-{}.chunk", flavor, sequence))
    }
}

impl Gatherable for Store {
    fn select(&self, field: &Text, record: Identifier, at: Option<u64>) -> Result<BTreeSet<Value>, StoreError> {
        Store::select(self, field, record, at)
    }
}

impl SearchIndex for Store {
    fn index(
        &self,
        field: Text,
        term: Text,
        position: Position,
        version: u64,
        action: Action,
    ) -> Result<(), StoreError> {
        self.index_term(field, term, position, version, action)
    }
}

impl Syncable for Store {
    fn sync(&self) -> Result<(), StoreError> {
        self.latch.await_count(self.submitted.load(Ordering::SeqCst));
        if let Some(failure) = self.indexer.take_failures().into_iter().next() {
            return Err(failure);
        }
        self.rotate_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(StoreConfig::with_data_dir(dir.path())).unwrap();
        (store, dir)
    }

    #[test]
    fn test_add_select_remove() {
        let (store, _dir) = store();
        let field = Text::new("age");
        let record = Identifier::new(1);

        assert!(store.add(&field, Value::Int(30), record).unwrap());
        assert!(!store.add(&field, Value::Int(30), record).unwrap());
        assert_eq!(store.select(&field, record, None).unwrap().len(), 1);

        assert!(store.remove(&field, Value::Int(30), record).unwrap());
        assert!(!store.remove(&field, Value::Int(30), record).unwrap());
        assert!(store.select(&field, record, None).unwrap().is_empty());
    }

    #[test]
    fn test_width_normalized_writes_collide() {
        let (store, _dir) = store();
        let field = Text::new("count");
        let record = Identifier::new(1);
        assert!(store.add(&field, Value::Int(5), record).unwrap());
        // 5 as a long is the same logical value.
        assert!(!store.add(&field, Value::Long(5), record).unwrap());
    }

    #[test]
    fn test_find_operators() {
        let (store, _dir) = store();
        let field = Text::new("age");
        for (record, age) in [(1u64, 25), (2, 30), (3, 35)] {
            store.add(&field, Value::Int(age), Identifier::new(record)).unwrap();
        }

        let found = store.find(&field, &Operator::Gt(Value::Int(25)), None).unwrap();
        assert_eq!(found, BTreeSet::from([Identifier::new(2), Identifier::new(3)]));

        let found = store.find(&field, &Operator::Eq(Value::Int(25)), None).unwrap();
        assert_eq!(found, BTreeSet::from([Identifier::new(1)]));

        let found = store
            .find(&field, &Operator::Between(Value::Int(25), Value::Int(35)), None)
            .unwrap();
        assert_eq!(found, BTreeSet::from([Identifier::new(1), Identifier::new(2)]));

        let found = store.find(&field, &Operator::Ne(Value::Int(30)), None).unwrap();
        assert_eq!(found, BTreeSet::from([Identifier::new(1), Identifier::new(3)]));
    }

    #[test]
    fn test_gather_matches_select() {
        let (store, _dir) = store();
        let field = Text::new("tags");
        let record = Identifier::new(9);
        store.add(&field, Value::from("a"), record).unwrap();
        store.add(&field, Value::from("b"), record).unwrap();

        let selected = Store::select(&store, &field, record, None).unwrap();
        let gathered = store.gather(&field, record, None).unwrap();
        assert_eq!(selected.len(), gathered.len());
        for value in &selected {
            assert!(gathered.contains(value));
        }
    }

    #[test]
    fn test_search_finds_substrings() {
        let (store, _dir) = store();
        let field = Text::new("bio");
        store.add(&field, Value::from("rust kernel"), Identifier::new(1)).unwrap();
        store.add(&field, Value::from("kernel panic"), Identifier::new(2)).unwrap();
        store.add(&field, Value::Int(42), Identifier::new(3)).unwrap();

        let hits = store.search(&field, &Text::new("kernel")).unwrap();
        assert_eq!(hits, BTreeSet::from([Identifier::new(1), Identifier::new(2)]));
        let hits = store.search(&field, &Text::new("rust")).unwrap();
        assert_eq!(hits, BTreeSet::from([Identifier::new(1)]));
        assert!(store.search(&field, &Text::new("zzz")).unwrap().is_empty());
    }

    #[test]
    fn test_describe_lists_live_fields() {
        let (store, _dir) = store();
        let record = Identifier::new(4);
        store.add(&Text::new("name"), Value::from("ada"), record).unwrap();
        store.add(&Text::new("age"), Value::Int(36), record).unwrap();
        store.remove(&Text::new("age"), Value::Int(36), record).unwrap();

        let fields = store.describe(record, None).unwrap();
        assert_eq!(fields, BTreeSet::from([Text::new("name")]));
    }

    #[test]
    fn test_time_travel_versions() {
        let (store, _dir) = store();
        let field = Text::new("age");
        let record = Identifier::new(1);

        store.add(&field, Value::Int(30), record).unwrap();
        let after_add = store.current_version() - 1;
        store.remove(&field, Value::Int(30), record).unwrap();
        let after_remove = store.current_version() - 1;
        store.add(&field, Value::Int(31), record).unwrap();

        assert_eq!(
            store.select(&field, record, Some(after_add)).unwrap(),
            BTreeSet::from([Value::Int(30)])
        );
        assert_eq!(store.select(&field, record, Some(after_remove)).unwrap(), BTreeSet::new());
        assert_eq!(
            store.select(&field, record, None).unwrap(),
            BTreeSet::from([Value::Int(31)])
        );
    }

    #[test]
    fn test_sync_seals_and_reads_keep_working() {
        let (store, dir) = store();
        let field = Text::new("name");
        store.add(&field, Value::from("ada"), Identifier::new(1)).unwrap();
        store.sync().unwrap();

        // The open chunks are drained into sealed files.
        assert_eq!(store.pending_revisions(), 0);
        let chunk_files = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("chunk"))
            .count();
        assert!(chunk_files >= 2, "expected sealed table and index chunks");

        // Reads merge the sealed chunk with the fresh open one.
        assert_eq!(
            store.select(&field, Identifier::new(1), None).unwrap(),
            BTreeSet::from([Value::from("ada")])
        );
        store.add(&field, Value::from("grace"), Identifier::new(2)).unwrap();
        assert_eq!(
            store.select(&field, Identifier::new(2), None).unwrap(),
            BTreeSet::from([Value::from("grace")])
        );
    }

    #[test]
    fn test_reopen_resumes_versions() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::with_data_dir(dir.path());
        let resumed_from;
        {
            let store = Store::open(config.clone()).unwrap();
            store.add(&Text::new("a"), Value::Int(1), Identifier::new(1)).unwrap();
            store.sync().unwrap();
            resumed_from = store.current_version();
        }
        let store = Store::open(config).unwrap();
        assert!(store.current_version() >= resumed_from);
        assert_eq!(
            store.select(&Text::new("a"), Identifier::new(1), None).unwrap(),
            BTreeSet::from([Value::Int(1)])
        );
    }

    #[test]
    fn test_composite_cache_is_instance_scoped() {
        let (kernel, _dir) = store();
        let field = Text::new("age");
        let record = Identifier::new(1);

        let interned = kernel
            .composite_cache()
            .intern(&[&record, &field])
            .unwrap();
        assert_eq!(interned, kernel.record_composite(&field, record).unwrap());
        assert_eq!(kernel.composite_cache().len(), 1);

        // A second kernel instance starts with an empty cache.
        let (other, _dir2) = store();
        assert!(other.composite_cache().is_empty());
    }
}
