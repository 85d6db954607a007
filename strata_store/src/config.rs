// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Configuration
//!
//! Typed, self-validating configuration for the storage kernel, loadable from
//! TOML. The engine layer above owns *where* configuration comes from; the
//! kernel only defines the shape and the defaults.
//!
//! ```toml
//! data_dir = "/var/lib/strata"
//!
//! [bloom]
//! expected_insertions = 100000
//! false_positive_rate = 0.03
//!
//! [corpus]
//! max_substring_len = 32
//! stopwords = ["the", "a", "an"]
//! worker_count = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use strata_store_domain::StoreError;

/// Top-level kernel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding chunk, manifest, bloom, and sentinel files.
    pub data_dir: PathBuf,
    pub bloom: BloomConfig,
    pub corpus: CorpusConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("strata-data"),
            bloom: BloomConfig::default(),
            corpus: CorpusConfig::default(),
        }
    }
}

impl StoreConfig {
    /// A default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::io_error(format!("failed to read config {}: {}", path.display(), e)))?;
        let config: StoreConfig = toml::from_str(&raw)
            .map_err(|e| StoreError::invalid_config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::invalid_config("data_dir must not be empty"));
        }
        self.bloom.validate()?;
        self.corpus.validate()
    }
}

/// Bloom filter sizing for new chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Insertions one chunk's filter is sized for.
    pub expected_insertions: u32,
    /// Target false-positive rate at the design bound.
    pub false_positive_rate: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            expected_insertions: 100_000,
            false_positive_rate: 0.03,
        }
    }
}

impl BloomConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.expected_insertions == 0 {
            return Err(StoreError::invalid_config("bloom.expected_insertions must be positive"));
        }
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(StoreError::invalid_config(format!(
                "bloom.false_positive_rate {} is outside (0, 1)",
                self.false_positive_rate
            )));
        }
        Ok(())
    }
}

/// Corpus indexing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Longest substring emitted, in characters. 0 disables the cap.
    pub max_substring_len: u32,
    /// Whole tokens excluded from indexing.
    pub stopwords: Vec<String>,
    /// Indexing worker threads. 0 selects the available parallelism.
    pub worker_count: usize,
    /// Bytes of file-backed memory the mapped-set deduplicator may claim per
    /// value before the kernel falls back to the on-disk B+ tree.
    pub dedup_off_heap_budget: u64,
    /// Estimated average substring length used when sizing deduplicators.
    pub avg_substring_len: u32,
    /// Values no longer than this (in characters) use the brute-force
    /// deduplicator, which needs no auxiliary memory at all.
    pub brute_force_threshold: u32,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            max_substring_len: 40,
            stopwords: Vec::new(),
            worker_count: 0,
            dedup_off_heap_budget: 64 * 1024 * 1024,
            avg_substring_len: 20,
            brute_force_threshold: 96,
        }
    }
}

impl CorpusConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.avg_substring_len == 0 {
            return Err(StoreError::invalid_config("corpus.avg_substring_len must be positive"));
        }
        Ok(())
    }

    /// The worker count to actually spawn.
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(2)
        }
    }
}
