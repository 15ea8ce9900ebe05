//! Property-based tests for the engine's algebraic guarantees.
//!
//!  - Version comparison is a total order over arbitrary strings
//!  - Dataset checksums do not depend on enumeration order
//!  - Deltas between identical maps are empty, and applying a delta
//!    reproduces the target map

use faultsync_engine::{
    calculate_delta, checksum_map, compare_versions, dataset_checksum, ChecksumMap, Delta, Record,
};
use proptest::prelude::*;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn version_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u64..5, 0u64..5, 0u64..5).prop_map(|(a, b, c)| format!("{}.{}.{}", a, b, c)),
        (0u64..5, 0u64..5).prop_map(|(a, b)| format!("v{}.{}", a, b)),
        "[a-z0-9.]{0,8}",
    ]
}

fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::btree_map("[a-z]{1,6}", "[A-Z0-9]{1,4}", 0..30).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(id, code)| Record::new(id, json!({ "code": code })))
            .collect()
    })
}

fn checksum_map_strategy() -> impl Strategy<Value = ChecksumMap> {
    prop::collection::btree_map("[a-e]{1,2}", "[0-3]", 0..15)
}

proptest! {
    #[test]
    fn prop_compare_reflexive(a in version_strategy()) {
        prop_assert_eq!(compare_versions(&a, &a), Ordering::Equal);
    }

    #[test]
    fn prop_compare_antisymmetric(a in version_strategy(), b in version_strategy()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn prop_compare_transitive(
        a in version_strategy(),
        b in version_strategy(),
        c in version_strategy(),
    ) {
        if compare_versions(&a, &b) != Ordering::Greater
            && compare_versions(&b, &c) != Ordering::Greater
        {
            prop_assert_ne!(compare_versions(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn prop_checksum_order_independent(
        records in records_strategy(),
        seed in any::<u64>(),
    ) {
        let mut shuffled = records.clone();
        // Deterministic permutation driven by the seed
        let len = shuffled.len();
        if len > 1 {
            for i in 0..len {
                let j = ((seed >> (i % 64)) as usize + i * 7) % len;
                shuffled.swap(i, j);
            }
        }
        shuffled.reverse();

        prop_assert_eq!(dataset_checksum(&records), dataset_checksum(&shuffled));
    }

    #[test]
    fn prop_delta_of_identical_maps_is_empty(m in checksum_map_strategy()) {
        let delta = calculate_delta(&m, &m);
        prop_assert!(delta.is_empty());
    }

    #[test]
    fn prop_delta_partitions_ids(old in checksum_map_strategy(), new in checksum_map_strategy()) {
        let delta = calculate_delta(&old, &new);

        for id in &delta.added {
            prop_assert!(!old.contains_key(id) && new.contains_key(id));
        }
        for id in &delta.updated {
            prop_assert!(old[id] != new[id]);
        }
        for id in &delta.removed {
            prop_assert!(old.contains_key(id) && !new.contains_key(id));
        }
        prop_assert!(delta.added.is_disjoint(&delta.updated));
    }

    #[test]
    fn prop_applying_delta_reaches_target(
        old in records_strategy(),
        new in records_strategy(),
    ) {
        let delta: Delta = calculate_delta(&checksum_map(&old), &checksum_map(&new));

        let mut merged: BTreeMap<String, Record> =
            old.into_iter().map(|r| (r.id.clone(), r)).collect();
        delta.apply_to(&mut merged, &new);

        let target: BTreeMap<String, Record> =
            new.into_iter().map(|r| (r.id.clone(), r)).collect();
        prop_assert_eq!(merged, target);
    }
}
