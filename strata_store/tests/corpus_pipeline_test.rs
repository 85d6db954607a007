// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Corpus pipeline integration tests: substring emission, idempotent
//! indexing, concurrent insertion equivalence, and the brute-force
//! deduplicator property.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use strata_store::chunk::Chunk;
use strata_store::config::{BloomConfig, CorpusConfig};
use strata_store::corpus::{BruteForceDeduplicator, CorpusIndexer, CountUpLatch, Deduplicator, IndexTask};
use strata_store_domain::{Action, CorpusFlavor, Identifier, Position, Revision, Text};

fn corpus_config(max_len: u32, workers: usize) -> CorpusConfig {
    CorpusConfig {
        max_substring_len: max_len,
        worker_count: workers,
        ..CorpusConfig::default()
    }
}

fn index_value(
    indexer: &CorpusIndexer,
    chunk: &Arc<Chunk<CorpusFlavor>>,
    latch: &Arc<CountUpLatch>,
    field: &str,
    value: &str,
    record: u64,
    version: u64,
) {
    indexer
        .submit(IndexTask::new(
            Arc::clone(chunk),
            Arc::clone(latch),
            Text::new(field),
            Text::new(value),
            Position::new(Identifier::new(record), 0),
            version,
            Action::Add,
        ))
        .unwrap();
}

/// The (term, position) pairs recorded for a field.
fn dump_terms(chunk: &Chunk<CorpusFlavor>) -> BTreeSet<(String, u64, u32)> {
    chunk
        .dump()
        .unwrap()
        .into_iter()
        .map(|revision| {
            (
                revision.key().as_str().to_string(),
                revision.value().record().value(),
                revision.value().offset(),
            )
        })
        .collect()
}

#[test]
fn substring_emission_with_cap_and_dedup() {
    // field = "bio", value = "ab ab", record = 7, cap = 2, no stopwords.
    let indexer = CorpusIndexer::new(&corpus_config(2, 1)).unwrap();
    let chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    let latch = Arc::new(CountUpLatch::new());
    index_value(&indexer, &chunk, &latch, "bio", "ab ab", 7, 1);
    latch.await_count(1);

    let expected: BTreeSet<(String, u64, u32)> = [
        ("a", 0u32),
        ("ab", 0),
        ("b", 1),
        ("b ", 1),
        (" ", 2),
        (" a", 2),
    ]
    .into_iter()
    .map(|(term, offset)| (term.to_string(), 7u64, offset))
    .collect();

    // "ab" occurs at 0 and 3 but is emitted once, at its first occurrence.
    assert_eq!(dump_terms(&chunk), expected);
}

#[test]
fn indexing_twice_is_idempotent() {
    let indexer = CorpusIndexer::new(&corpus_config(3, 2)).unwrap();
    let chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    let latch = Arc::new(CountUpLatch::new());

    index_value(&indexer, &chunk, &latch, "bio", "same value", 5, 9);
    latch.await_count(1);
    let first = dump_terms(&chunk);

    // The same (field, value, record, version) again.
    index_value(&indexer, &chunk, &latch, "bio", "same value", 5, 9);
    latch.await_count(2);
    let second = dump_terms(&chunk);

    assert_eq!(first, second);
}

#[test]
fn stopwords_suppress_whole_tokens() {
    let config = CorpusConfig {
        max_substring_len: 0,
        worker_count: 1,
        stopwords: vec!["the".to_string()],
        ..CorpusConfig::default()
    };
    let indexer = CorpusIndexer::new(&config).unwrap();
    let chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    let latch = Arc::new(CountUpLatch::new());
    index_value(&indexer, &chunk, &latch, "bio", "the fox", 1, 1);
    latch.await_count(1);

    let terms: BTreeSet<String> = dump_terms(&chunk).into_iter().map(|(term, _, _)| term).collect();
    assert!(!terms.contains("the"));
    assert!(terms.contains("fox"));
    assert!(terms.contains("the f"), "substrings spanning the token are kept");
}

#[test]
fn concurrent_insertion_matches_sequential_dump() {
    // Two workers inserting substrings of disjoint values into one chunk.
    let concurrent_chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    {
        let indexer = CorpusIndexer::new(&corpus_config(4, 2)).unwrap();
        let latch = Arc::new(CountUpLatch::new());
        index_value(&indexer, &concurrent_chunk, &latch, "doc", "first disjoint value", 1, 1);
        index_value(&indexer, &concurrent_chunk, &latch, "doc", "second disjoint value", 2, 2);
        latch.await_count(2);
    }

    // The same inserts on one worker, in the opposite submission order.
    let sequential_chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    {
        let indexer = CorpusIndexer::new(&corpus_config(4, 1)).unwrap();
        let latch = Arc::new(CountUpLatch::new());
        index_value(&indexer, &sequential_chunk, &latch, "doc", "second disjoint value", 2, 2);
        index_value(&indexer, &sequential_chunk, &latch, "doc", "first disjoint value", 1, 1);
        latch.await_count(2);
    }

    assert_eq!(
        concurrent_chunk.dump().unwrap(),
        sequential_chunk.dump().unwrap(),
        "dumped sorted content must not depend on insertion interleaving"
    );
}

#[test]
fn direct_concurrent_chunk_inserts_are_safe() {
    let chunk = Arc::new(Chunk::<CorpusFlavor>::open(&BloomConfig::default()));
    let workers: Vec<_> = (0..4u64)
        .map(|worker| {
            let chunk = Arc::clone(&chunk);
            std::thread::spawn(move || {
                for i in 0..50u64 {
                    chunk
                        .insert(Revision::<CorpusFlavor>::new(
                            Text::new("f"),
                            Text::new(format!("term-{}-{}", worker, i)),
                            Position::new(Identifier::new(worker), i as u32),
                            worker * 100 + i,
                            Action::Add,
                        ))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let dumped = chunk.dump().unwrap();
    assert_eq!(dumped.len(), 200);
    let mut sorted = dumped.clone();
    sorted.sort();
    assert_eq!(dumped, sorted);
}

proptest! {
    /// Brute-force deduplicator correctness: `add(s[start..end])` returns
    /// false iff an identical character run begins at some k < start.
    #[test]
    fn brute_force_dedup_matches_definition(content in "[ab ]{1,24}") {
        let parent = Text::new(content.as_str());
        let mut dedup = BruteForceDeduplicator::new(parent.clone());
        let bytes = content.as_bytes();

        // Depth-first left-to-right enumeration, as the indexer performs it.
        for start in 0..bytes.len() {
            for end in (start + 1)..=bytes.len() {
                let needle = &bytes[start..end];
                let earlier_run_exists = (0..start).any(|k| bytes[k..].starts_with(needle));
                let admitted = dedup.add(&parent.slice(start, end)).unwrap();
                prop_assert_eq!(admitted, !earlier_run_exists, "substring {}..{}", start, end);
            }
        }
    }
}
