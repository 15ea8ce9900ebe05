//! Edge case tests for faultsync-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use faultsync_engine::{
    calculate_delta, checksum_map, compare_versions, dataset_checksum, is_newer_version,
    parse_version, Delta, ExportBundle, Record, SemVer,
};
use chrono::Utc;
use serde_json::json;
use std::cmp::Ordering;

// ============================================================================
// Version Edge Cases
// ============================================================================

#[test]
fn huge_version_components() {
    let max = format!("{}.{}.{}", u64::MAX, u64::MAX, u64::MAX);
    assert_eq!(parse_version(&max), SemVer::new(u64::MAX, u64::MAX, u64::MAX));

    // One past u64::MAX does not parse and falls back to zero
    assert_eq!(parse_version("18446744073709551616.0.0"), SemVer::ZERO);
}

#[test]
fn malformed_versions_sort_first() {
    assert!(is_newer_version("0.0.1", "not-a-version"));
    assert_eq!(compare_versions("", "0.0.0"), Ordering::Equal);
    assert_eq!(compare_versions("junk", "garbage"), Ordering::Equal);
}

#[test]
fn numeric_not_lexicographic_ordering() {
    // "1.10.0" sorts before "1.9.0" as a string but not as a version
    assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
    assert_eq!(compare_versions("1.02.0", "1.2.0"), Ordering::Equal);
}

// ============================================================================
// Record Edge Cases
// ============================================================================

#[test]
fn unicode_ids_and_payloads() {
    let records = vec![
        Record::new("日本語-001", json!({"title": "過電流"})),
        Record::new("émoji-🚨", json!({"title": "🔥 overheat"})),
        Record::new("plain", json!({"title": "Line\nbreak\ttab"})),
    ];

    let mut reversed = records.clone();
    reversed.reverse();
    assert_eq!(dataset_checksum(&records), dataset_checksum(&reversed));

    let bundle = ExportBundle::new(Some("1.0.0".into()), records, Utc::now());
    let json = bundle.to_json_pretty().unwrap();
    let restored = ExportBundle::from_json(&json).unwrap();
    assert!(restored.validate().is_ok());
    assert_eq!(restored, bundle);
}

#[test]
fn deeply_nested_payload() {
    let mut nested = json!({"leaf": true});
    for i in 0..64 {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(format!("level{}", i), nested);
        nested = serde_json::Value::Object(wrapper);
    }
    let record = Record::new("deep", nested);
    assert!(record.is_sealed());
}

#[test]
fn large_record_set_delta() {
    let old: Vec<Record> = (0..5_000)
        .map(|i| Record::new(format!("r{:05}", i), json!({"code": i})))
        .collect();
    let mut new = old.clone();
    new.truncate(4_000);
    new[0] = Record::new("r00000", json!({"code": "changed"}));
    new.push(Record::new("extra", json!({"code": -1})));

    let delta = calculate_delta(&checksum_map(&old), &checksum_map(&new));
    assert_eq!(delta.added.len(), 1);
    assert_eq!(delta.updated.len(), 1);
    assert_eq!(delta.removed.len(), 1_000);
}

#[test]
fn delta_from_changes_on_empty_store() {
    let fetched = vec![Record::new("a", json!({})), Record::new("b", json!({}))];
    let delta = Delta::from_changes(&Default::default(), &fetched, &["a".to_string()]);

    // Removal wins even for an id the store has never seen.
    assert_eq!(delta.added.len(), 1);
    assert!(delta.added.contains("b"));
    assert!(delta.removed.is_empty());
}
