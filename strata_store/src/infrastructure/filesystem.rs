// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Utilities
//!
//! The kernel's only gateway to the filesystem: create-or-open, read-only
//! mapping, atomic replace, recursive delete with retry, directory fsync, and
//! the process sentinel lock.
//!
//! ## Contracts
//!
//! - [`open_file`] creates parent directories and an empty file if absent and
//!   never truncates an existing file.
//! - [`replace`] is atomic at filesystem granularity; readers holding a
//!   mapping of the replaced file keep reading their mapping until it is
//!   dropped. Unmapping is by dropping the [`Mmap`]; there is no forced-unmap
//!   primitive, so in-flight readers may hold a file longer than expected.
//! - [`ProcessLock::acquire`] fails with a `LockError` when another process
//!   holds the sentinel, and logs a warning (but succeeds) when this process
//!   re-acquires its own sentinel.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use fs4::fs_std::FileExt;
use memmap2::{Mmap, MmapOptions};
use tracing::warn;

use strata_store_domain::StoreError;

/// Opens `path` for reading and writing, creating parent directories and an
/// empty file as needed. Never truncates.
pub fn open_file(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::io_error(format!("failed to create {}: {}", parent.display(), e)))?;
        }
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| StoreError::io_error(format!("failed to open {}: {}", path.display(), e)))
}

/// Maps the whole of `path` read-only.
pub fn map_read(path: &Path) -> Result<Mmap, StoreError> {
    let file = File::open(path)
        .map_err(|e| StoreError::io_error(format!("failed to open {} for mapping: {}", path.display(), e)))?;
    let len = file
        .metadata()
        .map_err(|e| StoreError::io_error(format!("failed to stat {}: {}", path.display(), e)))?
        .len();
    if len == 0 {
        return Err(StoreError::io_error(format!("cannot map empty file {}", path.display())));
    }
    unsafe {
        MmapOptions::new()
            .map(&file)
            .map_err(|e| StoreError::io_error(format!("failed to map {}: {}", path.display(), e)))
    }
}

/// Atomically installs `incoming` at `target` via rename.
pub fn replace(target: &Path, incoming: &Path) -> Result<(), StoreError> {
    std::fs::rename(incoming, target).map_err(|e| {
        StoreError::io_error(format!(
            "failed to replace {} with {}: {}",
            target.display(),
            incoming.display(),
            e
        ))
    })
}

/// Recursively deletes `path`, retrying a bounded number of times to absorb
/// not-empty races with writers that are still winding down.
pub fn remove_dir_all_retry(path: &Path, attempts: u32) -> Result<(), StoreError> {
    let mut remaining = attempts.max(1);
    loop {
        match std::fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                remaining -= 1;
                if remaining == 0 {
                    return Err(StoreError::io_error(format!(
                        "failed to remove {} after {} attempts: {}",
                        path.display(),
                        attempts,
                        e
                    )));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

/// Fsyncs a directory so renames and creations within it are durable.
pub fn fsync_dir(path: &Path) -> Result<(), StoreError> {
    let dir = File::open(path)
        .map_err(|e| StoreError::io_error(format!("failed to open directory {}: {}", path.display(), e)))?;
    dir.sync_all()
        .map_err(|e| StoreError::io_error(format!("failed to fsync directory {}: {}", path.display(), e)))
}

/// Sentinel paths currently locked by this process.
fn held_locks() -> &'static Mutex<HashSet<PathBuf>> {
    static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    HELD.get_or_init(|| Mutex::new(HashSet::new()))
}

/// An exclusive process lock held via a sentinel file.
///
/// The OS lock releases on drop. Re-acquiring a sentinel this process already
/// holds yields a non-owning handle whose drop leaves the original lock in
/// place.
#[derive(Debug)]
pub struct ProcessLock {
    file: Option<File>,
    path: PathBuf,
    owns: bool,
}

impl ProcessLock {
    /// Acquires an exclusive lock on the sentinel at `path`.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        // Create the sentinel before normalizing so repeated acquires of the
        // same path resolve to the same registry key.
        let file = open_file(path)?;
        let canonical = normalize(path);
        {
            let held = held_locks()
                .lock()
                .map_err(|_| StoreError::internal_error("process lock registry poisoned"))?;
            if held.contains(&canonical) {
                warn!(path = %canonical.display(), "re-acquiring a process lock already held by this process");
                return Ok(Self {
                    file: None,
                    path: canonical,
                    owns: false,
                });
            }
        }

        let locked = file
            .try_lock_exclusive()
            .map_err(|e| StoreError::lock_error(format!("failed to lock {}: {}", path.display(), e)))?;
        if !locked {
            return Err(StoreError::lock_error(format!(
                "{} is locked by another process",
                path.display()
            )));
        }

        held_locks()
            .lock()
            .map_err(|_| StoreError::internal_error("process lock registry poisoned"))?
            .insert(canonical.clone());
        Ok(Self {
            file: Some(file),
            path: canonical,
            owns: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if !self.owns {
            return;
        }
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        if let Ok(mut held) = held_locks().lock() {
            held.remove(&self.path);
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
