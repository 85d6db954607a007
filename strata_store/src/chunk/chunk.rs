// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk State Machine
//!
//! A [`Chunk`] moves through exactly one transition: `Open -> Sealed`.
//!
//! **Open**: inserts land in an in-memory `BTreeSet` ordered by `(locator,
//! key, value, version)` and register three composites (locator, locator+key,
//! and the full triple) with the chunk's Bloom filter. Insert and transfer
//! take the write lock; seeks take the read lock, so readers see unsealed
//! data.
//!
//! **Transfer** renders the sorted revisions through a buffered file sink,
//! remembering where each new locator and each new `(locator, key)` prefix
//! begins; those offsets become the [`Manifest`]. The Bloom filter is
//! persisted as a sibling file, everything is fsynced (files and directory),
//! and only then does the state flip to Sealed. Any I/O failure deletes the
//! partial files and leaves the chunk Open.
//!
//! **Sealed**: the data file is memory-mapped and immutable. A seek consults
//! the Bloom filter first - a miss returns without touching the manifest -
//! then binary-searches the manifest for the byte range and decodes only that
//! window. Further inserts fail with a `StateError`.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use strata_store_domain::{BloomFilter, ByteReader, ByteSink, Byteable, ChunkFlavor, Composite, Revision, StoreError};

use crate::chunk::manifest::{Manifest, ManifestEntry};
use crate::chunk::seek::{Accumulator, SeekKey};
use crate::chunk::stats::ChunkStats;
use crate::config::BloomConfig;
use crate::infrastructure::file_sink::{BufferedFileSink, MappedFileSink};
use crate::infrastructure::filesystem;

/// An append-only sorted container of revisions of one flavor.
pub struct Chunk<F: ChunkFlavor> {
    state: RwLock<ChunkState<F>>,
    stats: ChunkStats,
}

enum ChunkState<F: ChunkFlavor> {
    Open(OpenChunk<F>),
    Sealed(SealedChunk<F>),
}

struct OpenChunk<F: ChunkFlavor> {
    revisions: BTreeSet<Revision<F>>,
    bloom: BloomFilter,
    saturation_warned: bool,
}

struct SealedChunk<F: ChunkFlavor> {
    data: Mmap,
    manifest: Manifest,
    bloom: BloomFilter,
    count: usize,
    max_version: u64,
    data_path: PathBuf,
    _flavor: PhantomData<F>,
}

impl<F: ChunkFlavor> Chunk<F> {
    /// Creates an open chunk whose Bloom filter is sized by `bloom`.
    pub fn open(bloom: &BloomConfig) -> Self {
        Self {
            state: RwLock::new(ChunkState::Open(OpenChunk {
                revisions: BTreeSet::new(),
                bloom: BloomFilter::with_capacity(bloom.expected_insertions, bloom.false_positive_rate),
                saturation_warned: false,
            })),
            stats: ChunkStats::new(),
        }
    }

    /// Loads a sealed chunk from `data_path` and its sibling manifest and
    /// bloom files, validating every revision in the file.
    pub fn load_sealed(data_path: &Path) -> Result<Self, StoreError> {
        let data = filesystem::map_read(data_path)?;
        let manifest_bytes = std::fs::read(manifest_path(data_path))
            .map_err(|e| StoreError::io_error(format!("failed to read manifest for {}: {}", data_path.display(), e)))?;
        let manifest = Manifest::load(&manifest_bytes)?;
        let bloom_bytes = std::fs::read(bloom_path(data_path))
            .map_err(|e| StoreError::io_error(format!("failed to read bloom for {}: {}", data_path.display(), e)))?;
        let bloom = BloomFilter::load(&bloom_bytes)?;
        if bloom.upgraded() {
            warn!(
                chunk = %data_path.display(),
                "bloom filter carried a legacy funnel tag; rewrite the file to upgrade it"
            );
        }

        // A full decode validates the file and recovers the version ceiling.
        let mut reader = ByteReader::new(&data[..]);
        let mut count = 0usize;
        let mut max_version = 0u64;
        while !reader.is_empty() {
            let revision = Revision::<F>::read_next(&mut reader)?;
            max_version = max_version.max(revision.version());
            count += 1;
        }

        Ok(Self {
            state: RwLock::new(ChunkState::Sealed(SealedChunk {
                data,
                manifest,
                bloom,
                count,
                max_version,
                data_path: data_path.to_path_buf(),
                _flavor: PhantomData,
            })),
            stats: ChunkStats::new(),
        })
    }

    /// Adds a revision to an open chunk. Fails with a `StateError` once the
    /// chunk is sealed.
    pub fn insert(&self, revision: Revision<F>) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let open = match &mut *state {
            ChunkState::Open(open) => open,
            ChunkState::Sealed(_) => {
                return Err(StoreError::state_error(format!(
                    "cannot insert into a sealed {} chunk",
                    F::NAME
                )));
            }
        };

        open.bloom.put(&revision.locator_composite()?);
        open.bloom.put(&revision.locator_key_composite()?);
        open.bloom.put(&revision.full_composite()?);
        if !open.saturation_warned && open.bloom.is_saturated() {
            open.saturation_warned = true;
            warn!(
                flavor = F::NAME,
                expected = open.bloom.expected_insertions(),
                "bloom filter saturated beyond its design bound; false positive rate is degrading"
            );
        }
        open.revisions.insert(revision);
        Ok(())
    }

    /// Folds the revisions matching `key` with version `<= up_to` into `acc`
    /// under toggle semantics.
    pub fn seek(&self, key: &SeekKey<F>, up_to: u64, acc: &mut Accumulator<F>) -> Result<(), StoreError> {
        let state = self.state.read();
        match &*state {
            ChunkState::Open(open) => {
                if !open.bloom.might_contain(&key.composite()?) {
                    self.stats.record_bloom_skip();
                    return Ok(());
                }
                for revision in &open.revisions {
                    if revision.version() <= up_to && key.matches(revision) {
                        acc.toggle(revision);
                    }
                }
                Ok(())
            }
            ChunkState::Sealed(sealed) => {
                if !sealed.bloom.might_contain(&key.composite()?) {
                    self.stats.record_bloom_skip();
                    return Ok(());
                }
                let Some((start, end)) = sealed.manifest.lookup(&key.manifest_composite()?) else {
                    return Ok(());
                };
                let window = sealed.window(start, end)?;
                let mut reader = ByteReader::new(window);
                let mut decoded = 0u64;
                while !reader.is_empty() {
                    let revision = Revision::<F>::read_next(&mut reader)?;
                    decoded += 1;
                    if revision.version() <= up_to && key.matches(&revision) {
                        acc.toggle(&revision);
                    }
                }
                self.stats.record_decoded(decoded);
                Ok(())
            }
        }
    }

    /// Renders an open chunk to `data_path` (with sibling `.manifest` and
    /// `.bloom` files), fsyncs everything, and flips the state to Sealed.
    ///
    /// Holds the write lock across the whole render. On failure the partial
    /// files are deleted and the chunk remains Open.
    pub fn transfer(&self, data_path: &Path) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let open = match &*state {
            ChunkState::Open(open) => open,
            ChunkState::Sealed(_) => {
                return Err(StoreError::state_error(format!(
                    "{} chunk has already been transferred",
                    F::NAME
                )));
            }
        };
        if open.revisions.is_empty() {
            return Err(StoreError::state_error(format!(
                "refusing to transfer an empty {} chunk",
                F::NAME
            )));
        }

        match render(open, data_path) {
            Ok(sealed) => {
                debug!(
                    flavor = F::NAME,
                    path = %data_path.display(),
                    revisions = sealed.count,
                    manifest_entries = sealed.manifest.len(),
                    "chunk transferred"
                );
                *state = ChunkState::Sealed(sealed);
                Ok(())
            }
            Err(error) => {
                // Remain Open; a later transfer may succeed elsewhere.
                for path in [data_path.to_path_buf(), manifest_path(data_path), bloom_path(data_path)] {
                    let _ = std::fs::remove_file(path);
                }
                Err(error)
            }
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(&*self.state.read(), ChunkState::Sealed(_))
    }

    /// Number of revisions held.
    pub fn len(&self) -> usize {
        match &*self.state.read() {
            ChunkState::Open(open) => open.revisions.len(),
            ChunkState::Sealed(sealed) => sealed.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The largest version stamp present, or 0 for an empty chunk.
    pub fn max_version(&self) -> u64 {
        match &*self.state.read() {
            ChunkState::Open(open) => open.revisions.iter().map(Revision::version).max().unwrap_or(0),
            ChunkState::Sealed(sealed) => sealed.max_version,
        }
    }

    /// Read-path statistics for this chunk.
    pub fn stats(&self) -> &ChunkStats {
        &self.stats
    }

    /// Lookups performed against the sealed manifest, if sealed.
    pub fn manifest_lookups(&self) -> u64 {
        match &*self.state.read() {
            ChunkState::Open(_) => 0,
            ChunkState::Sealed(sealed) => sealed.manifest.lookups(),
        }
    }

    /// Every revision in `(locator, key, value, version)` order. Sealed
    /// chunks decode the whole mapped file.
    pub fn dump(&self) -> Result<Vec<Revision<F>>, StoreError> {
        match &*self.state.read() {
            ChunkState::Open(open) => Ok(open.revisions.iter().cloned().collect()),
            ChunkState::Sealed(sealed) => {
                let mut reader = ByteReader::new(&sealed.data[..]);
                let mut revisions = Vec::with_capacity(sealed.count);
                while !reader.is_empty() {
                    revisions.push(Revision::<F>::read_next(&mut reader)?);
                }
                Ok(revisions)
            }
        }
    }

    /// The data file backing this chunk, once sealed.
    pub fn data_path(&self) -> Option<PathBuf> {
        match &*self.state.read() {
            ChunkState::Open(_) => None,
            ChunkState::Sealed(sealed) => Some(sealed.data_path.clone()),
        }
    }
}

impl<F: ChunkFlavor> SealedChunk<F> {
    fn window(&self, start: u64, end: u64) -> Result<&[u8], StoreError> {
        let len = self.data.len() as u64;
        if end > len || start > end {
            return Err(StoreError::decode_error(format!(
                "manifest range {}..{} exceeds chunk of {} bytes",
                start, end, len
            )));
        }
        Ok(&self.data[start as usize..end as usize])
    }
}

/// The sibling manifest file for a chunk data file.
pub(crate) fn manifest_path(data_path: &Path) -> PathBuf {
    data_path.with_extension("manifest")
}

/// The sibling bloom file for a chunk data file.
pub(crate) fn bloom_path(data_path: &Path) -> PathBuf {
    data_path.with_extension("bloom")
}

/// Streams `open`'s revisions to disk and builds the sealed form.
fn render<F: ChunkFlavor>(open: &OpenChunk<F>, data_path: &Path) -> Result<SealedChunk<F>, StoreError> {
    let mut sink = BufferedFileSink::create(data_path)?;

    // Offsets of the runs in progress at each manifest level.
    let mut locator_run: Option<(Composite, u64)> = None;
    let mut key_run: Option<(Composite, u64)> = None;
    let mut entries = Vec::new();

    for revision in &open.revisions {
        let position = sink.position()?;
        let locator_composite = revision.locator_composite()?;
        let key_composite = revision.locator_key_composite()?;

        let new_locator = locator_run.as_ref().map(|(c, _)| c != &locator_composite).unwrap_or(true);
        if new_locator {
            if let Some((composite, start)) = locator_run.take() {
                entries.push(ManifestEntry::new(composite, start, position));
            }
            if let Some((composite, start)) = key_run.take() {
                entries.push(ManifestEntry::new(composite, start, position));
            }
            locator_run = Some((locator_composite, position));
            key_run = Some((key_composite, position));
        } else if key_run.as_ref().map(|(c, _)| c != &key_composite).unwrap_or(true) {
            if let Some((composite, start)) = key_run.take() {
                entries.push(ManifestEntry::new(composite, start, position));
            }
            key_run = Some((key_composite, position));
        }

        revision.copy_to(&mut sink)?;
    }

    let end = sink.position()?;
    if let Some((composite, start)) = locator_run.take() {
        entries.push(ManifestEntry::new(composite, start, end));
    }
    if let Some((composite, start)) = key_run.take() {
        entries.push(ManifestEntry::new(composite, start, end));
    }
    sink.sync_all()?;

    let manifest = Manifest::new(entries);
    let mut manifest_sink = BufferedFileSink::create(&manifest_path(data_path))?;
    manifest.write_to(&mut manifest_sink)?;
    manifest_sink.sync_all()?;

    let bloom_bytes = open.bloom.get_bytes();
    let mut bloom_sink = MappedFileSink::create(&bloom_path(data_path), bloom_bytes.len() as u64)?;
    bloom_sink.put_slice(&bloom_bytes)?;
    bloom_sink.finish()?;

    if let Some(parent) = data_path.parent() {
        if !parent.as_os_str().is_empty() {
            filesystem::fsync_dir(parent)?;
        }
    }

    let max_version = open.revisions.iter().map(Revision::version).max().unwrap_or(0);
    Ok(SealedChunk {
        data: filesystem::map_read(data_path)?,
        manifest,
        bloom: BloomFilter::load(&bloom_bytes)?,
        count: open.revisions.len(),
        max_version,
        data_path: data_path.to_path_buf(),
        _flavor: PhantomData,
    })
}
