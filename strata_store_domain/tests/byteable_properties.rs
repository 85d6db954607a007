// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Property tests for the Byteable framework: round-trips for every primitive
//! and for composites of mixed parts, composite equality and size bounds, and
//! Bloom soundness under arbitrary insertion sequences.

use proptest::prelude::*;

use strata_store_domain::{
    BloomFilter, Byteable, Composite, FromBytes, Identifier, Position, Text, Value, MAX_COMPOSITE_SIZE,
};

fn arb_text() -> impl Strategy<Value = Text> {
    ".{0,40}".prop_map(Text::new)
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f32>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        ".{0,24}".prop_map(|s| Value::from(s.as_str())),
        any::<u64>().prop_map(|id| Value::Link(Identifier::new(id))),
    ]
}

fn arb_position() -> impl Strategy<Value = Position> {
    (any::<u64>(), any::<u32>()).prop_map(|(record, offset)| Position::new(Identifier::new(record), offset))
}

/// One part of a mixed-flavor composite, pre-encoded for comparison.
#[derive(Debug, Clone)]
enum Part {
    Id(Identifier),
    Text(Text),
    Value(Value),
    Position(Position),
}

impl Part {
    fn as_byteable(&self) -> &dyn Byteable {
        match self {
            Part::Id(x) => x,
            Part::Text(x) => x,
            Part::Value(x) => x,
            Part::Position(x) => x,
        }
    }
}

fn arb_part() -> impl Strategy<Value = Part> {
    prop_oneof![
        any::<u64>().prop_map(|id| Part::Id(Identifier::new(id))),
        arb_text().prop_map(Part::Text),
        arb_value().prop_map(Part::Value),
        arb_position().prop_map(Part::Position),
    ]
}

proptest! {
    #[test]
    fn round_trip_identifier(id in any::<u64>()) {
        let entity = Identifier::new(id);
        let bytes = entity.to_bytes().unwrap();
        prop_assert_eq!(Identifier::read_from(&bytes).unwrap(), entity);
    }

    #[test]
    fn round_trip_text(text in arb_text()) {
        let bytes = text.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), text.size());
        prop_assert_eq!(Text::read_from(&bytes).unwrap(), text);
    }

    #[test]
    fn round_trip_value(value in arb_value()) {
        let bytes = value.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), value.size());
        prop_assert_eq!(Value::read_from(&bytes).unwrap(), value);
    }

    #[test]
    fn round_trip_position(position in arb_position()) {
        let bytes = position.to_bytes().unwrap();
        prop_assert_eq!(Position::read_from(&bytes).unwrap(), position);
    }

    #[test]
    fn composite_size_bound(parts in prop::collection::vec(arb_part(), 1..=8)) {
        let refs: Vec<&dyn Byteable> = parts.iter().map(|p| p.as_byteable()).collect();
        let composite = Composite::of(&refs).unwrap();
        prop_assert!(composite.size() <= MAX_COMPOSITE_SIZE);
    }

    #[test]
    fn composite_round_trip(parts in prop::collection::vec(arb_part(), 1..=8)) {
        let refs: Vec<&dyn Byteable> = parts.iter().map(|p| p.as_byteable()).collect();
        let composite = Composite::of(&refs).unwrap();
        let restored = Composite::read_from(composite.as_bytes()).unwrap();
        prop_assert_eq!(&restored, &composite);
    }

    #[test]
    fn composite_equality_from_equal_parts(parts in prop::collection::vec(arb_part(), 1..=8)) {
        let refs: Vec<&dyn Byteable> = parts.iter().map(|p| p.as_byteable()).collect();
        let first = Composite::of(&refs).unwrap();
        let second = Composite::of(&refs).unwrap();
        prop_assert_eq!(first.as_bytes(), second.as_bytes());

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        first.hash(&mut ha);
        second.hash(&mut hb);
        prop_assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn bloom_soundness(keys in prop::collection::vec(prop::collection::vec(arb_part(), 1..=3), 1..64)) {
        let filter = BloomFilter::with_expected_insertions(keys.len() as u32);
        let composites: Vec<Composite> = keys
            .iter()
            .map(|parts| {
                let refs: Vec<&dyn Byteable> = parts.iter().map(|p| p.as_byteable()).collect();
                Composite::of(&refs).unwrap()
            })
            .collect();
        for composite in &composites {
            filter.put(composite);
        }
        for composite in &composites {
            prop_assert!(filter.might_contain(composite));
        }
    }
}
