// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-Backed Byte Sinks
//!
//! The file members of the sink family: a buffered streaming sink for chunk
//! rendering and a mapped-window sink for fixed-size artifacts such as Bloom
//! filter files. Both speak the domain's [`ByteSink`] contract, so entities
//! encode identically no matter where the bytes land.
//!
//! ## Buffering
//!
//! [`BufferedFileSink`] accumulates writes into a fixed scratch buffer
//! (64 KiB) and drains it on [`flush`](ByteSink::flush) or whenever the next
//! operation would not fit. Operations larger than the scratch buffer bypass
//! it entirely after a drain, so one oversized put never forces a double
//! copy. `position()` reports the underlying file offset plus unflushed
//! bytes. No partial writes are observable after a successful `flush()`.
//!
//! ## Durability
//!
//! [`write_byteable`] is the kernel's contract for writing one entity to an
//! open channel: take an exclusive lock on the file, write the entity at the
//! current position, fsync, release.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use fs4::fs_std::FileExt;
use memmap2::MmapMut;

use strata_store_domain::{ByteSink, Byteable, StoreError};

use crate::infrastructure::filesystem;

/// Scratch buffer size for [`BufferedFileSink`].
pub const SCRATCH_CAPACITY: usize = 64 * 1024;

/// A [`ByteSink`] that streams into a file through a fixed scratch buffer.
#[derive(Debug)]
pub struct BufferedFileSink {
    file: File,
    scratch: Vec<u8>,
    flushed: u64,
}

impl BufferedFileSink {
    /// Opens (or creates) `path` and positions the sink at the start.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::from_file(filesystem::open_file(path)?))
    }

    /// Wraps an already-open file, writing from its current position.
    pub fn from_file(file: File) -> Self {
        Self {
            file,
            scratch: Vec::with_capacity(SCRATCH_CAPACITY),
            flushed: 0,
        }
    }

    fn drain(&mut self) -> Result<(), StoreError> {
        if self.scratch.is_empty() {
            return Ok(());
        }
        self.file
            .write_all(&self.scratch)
            .map_err(|e| StoreError::io_error(format!("failed to drain scratch buffer: {}", e)))?;
        self.flushed += self.scratch.len() as u64;
        self.scratch.clear();
        Ok(())
    }

    /// Flushes scratch and asks the OS to make the file durable.
    pub fn sync_all(&mut self) -> Result<(), StoreError> {
        self.flush()?;
        self.file
            .sync_all()
            .map_err(|e| StoreError::io_error(format!("fsync failed: {}", e)))
    }

    /// Flushes and returns the underlying file.
    pub fn finish(mut self) -> Result<File, StoreError> {
        self.flush()?;
        Ok(self.file)
    }
}

impl ByteSink for BufferedFileSink {
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError> {
        if self.scratch.len() + 1 > SCRATCH_CAPACITY {
            self.drain()?;
        }
        self.scratch.push(byte);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.scratch.len() + bytes.len() > SCRATCH_CAPACITY {
            self.drain()?;
        }
        if bytes.len() > SCRATCH_CAPACITY {
            // Oversized writes bypass the scratch buffer after a drain.
            self.file
                .write_all(bytes)
                .map_err(|e| StoreError::io_error(format!("failed to write {} bytes: {}", bytes.len(), e)))?;
            self.flushed += bytes.len() as u64;
            return Ok(());
        }
        self.scratch.extend_from_slice(bytes);
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Ok(self.flushed + self.scratch.len() as u64)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.drain()?;
        self.file
            .flush()
            .map_err(|e| StoreError::io_error(format!("flush failed: {}", e)))
    }
}

/// A [`ByteSink`] over a writable memory map of a fixed-size file.
///
/// For artifacts whose exact size is known up front (Bloom filter files):
/// the file is sized once, the bytes land directly in the mapping, and
/// [`MappedFileSink::finish`] flushes the map and fsyncs the file.
#[derive(Debug)]
pub struct MappedFileSink {
    file: File,
    map: MmapMut,
    pos: usize,
}

impl MappedFileSink {
    /// Creates `path` with exactly `len` bytes and maps it for writing.
    pub fn create(path: &Path, len: u64) -> Result<Self, StoreError> {
        if len == 0 {
            return Err(StoreError::io_error(format!(
                "cannot map {} with zero length",
                path.display()
            )));
        }
        let file = filesystem::open_file(path)?;
        file.set_len(len)
            .map_err(|e| StoreError::io_error(format!("failed to size {}: {}", path.display(), e)))?;
        let map = unsafe {
            MmapMut::map_mut(&file)
                .map_err(|e| StoreError::io_error(format!("failed to map {} for writing: {}", path.display(), e)))?
        };
        Ok(Self { file, map, pos: 0 })
    }

    fn remaining(&self) -> usize {
        self.map.len() - self.pos
    }

    /// Flushes the mapping and fsyncs the file.
    pub fn finish(mut self) -> Result<(), StoreError> {
        self.flush()?;
        self.file
            .sync_all()
            .map_err(|e| StoreError::io_error(format!("fsync failed: {}", e)))
    }
}

impl ByteSink for MappedFileSink {
    fn put_u8(&mut self, byte: u8) -> Result<(), StoreError> {
        self.put_slice(&[byte])
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > self.remaining() {
            return Err(StoreError::io_error(format!(
                "mapped window overflow: {} bytes into {} remaining",
                bytes.len(),
                self.remaining()
            )));
        }
        self.map[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn position(&self) -> Result<u64, StoreError> {
        Ok(self.pos as u64)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.map
            .flush()
            .map_err(|e| StoreError::io_error(format!("mapped flush failed: {}", e)))
    }
}

/// Writes one entity to `file` at its current position under an exclusive
/// file lock, fsyncs, and releases the lock. Returns the bytes written.
///
/// This is the durability contract for single-entity channel writes: after a
/// successful return the entity is on stable storage and no other locker
/// observed a partial write.
pub fn write_byteable(entity: &dyn Byteable, file: &File) -> Result<u64, StoreError> {
    file.lock_exclusive()
        .map_err(|e| StoreError::lock_error(format!("failed to lock channel for writing: {}", e)))?;

    let outcome = (|| {
        let bytes = entity.to_bytes()?;
        let mut handle = file;
        handle
            .write_all(&bytes)
            .map_err(|e| StoreError::io_error(format!("failed to write entity: {}", e)))?;
        file.sync_all()
            .map_err(|e| StoreError::io_error(format!("fsync failed: {}", e)))?;
        Ok(bytes.len() as u64)
    })();

    let _ = FileExt::unlock(file);
    outcome
}
