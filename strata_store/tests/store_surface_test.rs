// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end tests of the store surface: writes fan out to all three
//! indexes, reads merge sealed and open chunks, history is addressable by
//! version, and a reopened store resumes where it left off.

use std::collections::BTreeSet;

use strata_store::config::StoreConfig;
use strata_store::store::{Operator, Store};
use strata_store_domain::{Gatherable, Identifier, Syncable, Text, Value};

fn fixture() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(StoreConfig::with_data_dir(dir.path())).unwrap();
    (store, dir)
}

#[test]
fn writes_are_visible_in_all_three_indexes() {
    let (store, _dir) = fixture();
    let field = Text::new("bio");
    let record = Identifier::new(1);
    store.add(&field, Value::from("storage kernel"), record).unwrap();

    // Table index: what does the record hold?
    assert_eq!(
        store.select(&field, record, None).unwrap(),
        BTreeSet::from([Value::from("storage kernel")])
    );
    // Value index: which records hold this value?
    assert_eq!(
        store
            .find(&field, &Operator::Eq(Value::from("storage kernel")), None)
            .unwrap(),
        BTreeSet::from([record])
    );
    // Corpus index: which records contain this term?
    assert_eq!(store.search(&field, &Text::new("kernel")).unwrap(), BTreeSet::from([record]));
}

#[test]
fn removed_values_disappear_from_search() {
    let (store, _dir) = fixture();
    let field = Text::new("bio");
    let record = Identifier::new(2);
    store.add(&field, Value::from("ephemeral"), record).unwrap();
    assert!(!store.search(&field, &Text::new("ephemeral")).unwrap().is_empty());

    store.remove(&field, Value::from("ephemeral"), record).unwrap();
    assert!(store.search(&field, &Text::new("ephemeral")).unwrap().is_empty());
}

#[test]
fn history_reads_honor_versions_across_seal() {
    let (store, _dir) = fixture();
    let field = Text::new("age");
    let record = Identifier::new(3);

    store.add(&field, Value::Int(30), record).unwrap();
    let after_thirty = store.current_version() - 1;
    store.sync().unwrap();

    store.remove(&field, Value::Int(30), record).unwrap();
    store.add(&field, Value::Int(31), record).unwrap();

    // The sealed chunk answers the historical read; the open chunk answers
    // the current one.
    assert_eq!(
        store.select(&field, record, Some(after_thirty)).unwrap(),
        BTreeSet::from([Value::Int(30)])
    );
    assert_eq!(
        store.select(&field, record, None).unwrap(),
        BTreeSet::from([Value::Int(31)])
    );
    assert!(store.verify(&field, &Value::Int(30), record, Some(after_thirty)).unwrap());
    assert!(!store.verify(&field, &Value::Int(30), record, None).unwrap());
}

#[test]
fn find_spans_sealed_and_open_chunks() {
    let (store, _dir) = fixture();
    let field = Text::new("score");
    store.add(&field, Value::Int(10), Identifier::new(1)).unwrap();
    store.sync().unwrap();
    store.add(&field, Value::Int(20), Identifier::new(2)).unwrap();

    let found = store.find(&field, &Operator::Gte(Value::Int(10)), None).unwrap();
    assert_eq!(found, BTreeSet::from([Identifier::new(1), Identifier::new(2)]));
    let found = store.find(&field, &Operator::Lt(Value::Int(20)), None).unwrap();
    assert_eq!(found, BTreeSet::from([Identifier::new(1)]));
}

#[test]
fn search_spans_sealed_and_open_chunks() {
    let (store, _dir) = fixture();
    let field = Text::new("doc");
    store.add(&field, Value::from("alpha beta"), Identifier::new(1)).unwrap();
    store.sync().unwrap();
    store.add(&field, Value::from("beta gamma"), Identifier::new(2)).unwrap();

    assert_eq!(
        store.search(&field, &Text::new("beta")).unwrap(),
        BTreeSet::from([Identifier::new(1), Identifier::new(2)])
    );
    assert_eq!(
        store.search(&field, &Text::new("alpha")).unwrap(),
        BTreeSet::from([Identifier::new(1)])
    );
}

#[test]
fn gather_returns_the_select_set_in_hash_order() {
    let (store, _dir) = fixture();
    let field = Text::new("tags");
    let record = Identifier::new(6);
    for tag in ["kernel", "storage", "index"] {
        store.add(&field, Value::from(tag), record).unwrap();
    }

    let selected = store.select(&field, record, None).unwrap();
    let gathered = store.gather(&field, record, None).unwrap();
    assert_eq!(gathered.len(), selected.len());
    for value in selected {
        assert!(gathered.contains(&value));
    }
}

#[test]
fn reopened_store_serves_sealed_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::with_data_dir(dir.path());
    let field = Text::new("bio");
    {
        let store = Store::open(config.clone()).unwrap();
        store.add(&field, Value::from("durable text"), Identifier::new(1)).unwrap();
        store.sync().unwrap();
    }

    let store = Store::open(config).unwrap();
    assert_eq!(
        store.select(&field, Identifier::new(1), None).unwrap(),
        BTreeSet::from([Value::from("durable text")])
    );
    assert_eq!(
        store.search(&field, &Text::new("durable")).unwrap(),
        BTreeSet::from([Identifier::new(1)])
    );
    // New writes continue above the recovered version ceiling.
    assert!(store.add(&field, Value::from("more"), Identifier::new(2)).unwrap());
    assert_eq!(
        store.find(&field, &Operator::Eq(Value::from("more")), None).unwrap(),
        BTreeSet::from([Identifier::new(2)])
    );
}

#[test]
fn describe_tracks_live_fields_over_time() {
    let (store, _dir) = fixture();
    let record = Identifier::new(8);
    store.add(&Text::new("name"), Value::from("ada"), record).unwrap();
    store.add(&Text::new("age"), Value::Int(36), record).unwrap();
    let both_live = store.current_version() - 1;
    store.remove(&Text::new("age"), Value::Int(36), record).unwrap();

    assert_eq!(
        store.describe(record, Some(both_live)).unwrap(),
        BTreeSet::from([Text::new("age"), Text::new("name")])
    );
    assert_eq!(store.describe(record, None).unwrap(), BTreeSet::from([Text::new("name")]));
}

#[test]
fn sync_is_idempotent_and_skips_empty_chunks() {
    let (store, dir) = fixture();
    store.sync().unwrap();
    // Nothing was written, so nothing was sealed.
    let chunk_files = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("chunk"))
        .count();
    assert_eq!(chunk_files, 0);

    store.add(&Text::new("a"), Value::Int(1), Identifier::new(1)).unwrap();
    store.sync().unwrap();
    store.sync().unwrap();
}
