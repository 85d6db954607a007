// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Corpus Indexer
//!
//! The asynchronous half of the full-text index: a fixed pool of OS worker
//! threads fed by a channel of [`IndexTask`]s. Each task expands one string
//! value into its deduplicated substrings and inserts the resulting corpus
//! revisions into the target chunk, then counts up the caller's latch -
//! success or failure - so `await_count` never hangs on a failed task.
//!
//! Tasks cannot be cancelled once enqueued; callers drain the latch. Failures
//! are recorded and surfaced on the next [`CorpusIndexer::take_failures`]
//! call (the store checks during `sync`). Ordering across tasks is not
//! preserved: the chunk's sorted structure and the toggle accumulator are
//! commutative, so it does not need to be.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Sender};
use tracing::{debug, error};

use strata_store_domain::{Action, CorpusFlavor, Position, Revision, StoreError, Text};

use crate::chunk::Chunk;
use crate::config::CorpusConfig;
use crate::corpus::dedup::AdaptiveDeduplicator;
use crate::corpus::latch::CountUpLatch;
use crate::corpus::substrings;

/// One unit of indexing work: a string value to expand under a field.
pub struct IndexTask {
    chunk: Arc<Chunk<CorpusFlavor>>,
    latch: Arc<CountUpLatch>,
    field: Text,
    term: Text,
    position: Position,
    version: u64,
    action: Action,
}

impl IndexTask {
    pub fn new(
        chunk: Arc<Chunk<CorpusFlavor>>,
        latch: Arc<CountUpLatch>,
        field: Text,
        term: Text,
        position: Position,
        version: u64,
        action: Action,
    ) -> Self {
        Self {
            chunk,
            latch,
            field,
            term,
            position,
            version,
            action,
        }
    }
}

/// Fixed-size worker pool performing substring indexing off the write path.
pub struct CorpusIndexer {
    sender: Option<Sender<IndexTask>>,
    workers: Vec<JoinHandle<()>>,
    failures: Arc<Mutex<Vec<StoreError>>>,
}

impl CorpusIndexer {
    /// Spawns the worker pool configured by `config`.
    pub fn new(config: &CorpusConfig) -> Result<Self, StoreError> {
        let (sender, receiver) = unbounded::<IndexTask>();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let stopwords: Arc<HashSet<String>> = Arc::new(config.stopwords.iter().cloned().collect());
        let config = Arc::new(config.clone());

        let worker_count = config.effective_worker_count();
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let receiver = receiver.clone();
            let failures = Arc::clone(&failures);
            let stopwords = Arc::clone(&stopwords);
            let config = Arc::clone(&config);
            let handle = std::thread::Builder::new()
                .name(format!("corpus-indexer-{}", index))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        if let Err(failure) = process(&task, &config, &stopwords) {
                            error!(field = %task.field, error = %failure, "corpus indexing task failed");
                            if let Ok(mut failures) = failures.lock() {
                                failures.push(failure);
                            }
                        }
                        // Count up even on failure so awaiters drain.
                        task.latch.count_up();
                    }
                })
                .map_err(|e| StoreError::internal_error(format!("failed to spawn indexing worker: {}", e)))?;
            workers.push(handle);
        }
        debug!(workers = worker_count, "corpus indexer started");

        Ok(Self {
            sender: Some(sender),
            workers,
            failures,
        })
    }

    /// Enqueues a task. Completion is observable through the task's latch.
    pub fn submit(&self, task: IndexTask) -> Result<(), StoreError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| StoreError::state_error("corpus indexer has shut down"))?;
        sender
            .send(task)
            .map_err(|_| StoreError::state_error("corpus indexer workers are gone"))
    }

    /// Drains and returns failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<StoreError> {
        self.failures
            .lock()
            .map(|mut failures| std::mem::take(&mut *failures))
            .unwrap_or_default()
    }
}

impl Drop for CorpusIndexer {
    fn drop(&mut self) {
        // Closing the channel lets workers finish the queue and exit.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Expands one task into corpus revisions.
fn process(task: &IndexTask, config: &CorpusConfig, stopwords: &HashSet<String>) -> Result<(), StoreError> {
    let mut dedup = AdaptiveDeduplicator::pick(&task.term, config)?;
    substrings::enumerate(
        &task.term,
        config.max_substring_len as usize,
        stopwords,
        &mut dedup,
        |substring, char_offset| {
            let position = Position::new(task.position.record(), task.position.offset() + char_offset);
            task.chunk.insert(Revision::<CorpusFlavor>::new(
                task.field.clone(),
                substring,
                position,
                task.version,
                task.action,
            ))
        },
    )
}
