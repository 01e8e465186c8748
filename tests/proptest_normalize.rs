//! Property-based tests using proptest
//!
//! These tests check that normalization accepts any payload shape and that
//! sheet output does not depend on the order rows arrive in.

use gcp_inventory::inventory::{
    CellValue, Grouping, NormalizedRow, Normalizer, SheetAggregator, IDENTITY_COLUMNS,
};
use gcp_inventory::resource::ResourceRecord;
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Arbitrary JSON value, nested a few levels deep
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _./:-]{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z_.]{0,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// Payload object; keys may collide with the identity columns
fn arb_payload() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        prop_oneof![
            Just("name".to_string()),
            Just("location".to_string()),
            Just("project".to_string()),
            "[a-zA-Z_]{0,10}",
        ],
        arb_json(),
        0..8,
    )
    .prop_map(|m| Value::Object(m.into_iter().collect()))
}

fn arb_record() -> impl Strategy<Value = ResourceRecord> {
    (
        prop_oneof![Just("compute_instances"), Just("storage_buckets")],
        prop_oneof![Just("proj-a"), Just("proj-b")],
        "[a-z][a-z0-9-]{0,12}",
        prop_oneof![Just(""), Just("us-central1"), Just("europe-west1-b")],
        arb_payload(),
    )
        .prop_map(|(resource_type, project, name, location, raw_data)| ResourceRecord {
            resource_type: resource_type.to_string(),
            project: project.to_string(),
            name,
            location: location.to_string(),
            raw_data,
        })
}

fn column_names(row: &NormalizedRow) -> Vec<String> {
    row.column_names().map(str::to_string).collect()
}

proptest! {
    /// Any payload normalizes to unique, non-empty columns led by the identity columns
    #[test]
    fn prop_normalize_is_total(record in arb_record(), expand in any::<bool>()) {
        let row = Normalizer::new(expand).normalize(record.clone());
        let names = column_names(&row);

        prop_assert_eq!(&names[..IDENTITY_COLUMNS.len()], &IDENTITY_COLUMNS.map(String::from)[..]);
        prop_assert!(names.iter().all(|n| !n.is_empty()));

        let unique: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());

        prop_assert_eq!(row.name(), record.name.as_str());
        prop_assert_eq!(row.project(), record.project.as_str());
    }

    /// Without expansion, nested values decode back to the original JSON
    #[test]
    fn prop_nested_values_round_trip(nested in prop::collection::btree_map("k[a-z]{0,6}", arb_json(), 1..5)) {
        let raw: Map<String, Value> = nested.clone().into_iter().collect();
        let record = ResourceRecord {
            resource_type: "gke_clusters".to_string(),
            project: "proj-a".to_string(),
            name: "cluster".to_string(),
            location: String::new(),
            raw_data: Value::Object(raw),
        };
        let row = Normalizer::new(false).normalize(record);

        for (key, value) in nested {
            match (&value, row.get(&key)) {
                (Value::Null, cell) => prop_assert!(cell.is_none()),
                (Value::Array(_) | Value::Object(_), Some(CellValue::String(encoded))) => {
                    let decoded: Value = serde_json::from_str(encoded).unwrap();
                    prop_assert_eq!(decoded, value);
                }
                (Value::Array(_) | Value::Object(_), other) => {
                    prop_assert!(false, "{} encoded as {:?}", key, other);
                }
                (_, cell) => prop_assert!(cell.is_some()),
            }
        }
    }

    /// Shuffling the input rows never changes the built sheets
    #[test]
    fn prop_sheets_ignore_arrival_order(
        (records, shuffled) in prop::collection::vec(arb_record(), 0..12)
            .prop_flat_map(|records| {
                let shuffled = Just(records.clone()).prop_shuffle();
                (Just(records), shuffled)
            })
    ) {
        let normalizer = Normalizer::new(false);
        let expected = vec!["compute_instances", "storage_buckets"];

        let mut first = SheetAggregator::new(Grouping::ByResourceType, expected.clone());
        first.extend(records.into_iter().map(|r| normalizer.normalize(r)));

        let mut second = SheetAggregator::new(Grouping::ByResourceType, expected);
        second.extend(shuffled.into_iter().map(|r| normalizer.normalize(r)));

        prop_assert_eq!(first.build(), second.build());
    }
}
