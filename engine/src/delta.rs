//! Delta computation between two versions of the record set.
//!
//! A [`Delta`] is derived from two id→checksum maps and is never persisted.
//! Sets are ordered so that deltas compare and serialize deterministically.

use crate::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Mapping from record id to content checksum.
pub type ChecksumMap = BTreeMap<RecordId, String>;

/// Ids added, updated and removed between two record sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub added: BTreeSet<RecordId>,
    pub updated: BTreeSet<RecordId>,
    pub removed: BTreeSet<RecordId>,
}

impl Delta {
    /// Whether the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total number of ids touched.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Ids whose fetched record must be written.
    pub fn upserts(&self) -> impl Iterator<Item = &RecordId> {
        self.added.iter().chain(self.updated.iter())
    }

    /// Classify a server change list against the current contents.
    ///
    /// Fetched records that are unknown locally are added, those whose
    /// checksum differs are updated, and identical ones are skipped.
    /// Removal wins over an upsert of the same id. Removal of an id that is
    /// not present locally is a no-op and does not appear in the delta.
    pub fn from_changes(current: &ChecksumMap, fetched: &[Record], removed: &[RecordId]) -> Self {
        let requested: BTreeSet<&str> = removed.iter().map(String::as_str).collect();

        let mut delta = Delta {
            removed: removed
                .iter()
                .filter(|id| current.contains_key(*id))
                .cloned()
                .collect(),
            ..Default::default()
        };

        for record in fetched {
            if requested.contains(record.id.as_str()) {
                continue;
            }
            match current.get(&record.id) {
                None => {
                    delta.added.insert(record.id.clone());
                }
                Some(checksum) if *checksum != record.content_checksum => {
                    delta.updated.insert(record.id.clone());
                }
                Some(_) => {}
            }
        }

        delta
    }

    /// Apply the delta to an id-keyed record map.
    ///
    /// Records referenced by `added`/`updated` are taken from `fetched`.
    /// Returns the number of ids written or removed.
    pub fn apply_to(&self, records: &mut BTreeMap<RecordId, Record>, fetched: &[Record]) -> usize {
        let by_id: HashMap<&str, &Record> =
            fetched.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut touched = 0;
        for id in self.upserts() {
            if let Some(record) = by_id.get(id.as_str()) {
                records.insert(id.clone(), (*record).clone());
                touched += 1;
            }
        }
        for id in &self.removed {
            if records.remove(id).is_some() {
                touched += 1;
            }
        }
        touched
    }
}

/// Compute the delta that turns `old` into `new`.
pub fn calculate_delta(old: &ChecksumMap, new: &ChecksumMap) -> Delta {
    let mut delta = Delta::default();

    for (id, checksum) in new {
        match old.get(id) {
            None => {
                delta.added.insert(id.clone());
            }
            Some(previous) if previous != checksum => {
                delta.updated.insert(id.clone());
            }
            Some(_) => {}
        }
    }

    for id in old.keys() {
        if !new.contains_key(id) {
            delta.removed.insert(id.clone());
        }
    }

    delta
}

/// Build the id→checksum map of a record set.
pub fn checksum_map<'a, I>(records: I) -> ChecksumMap
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .map(|r| (r.id.clone(), r.content_checksum.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: &[(&str, &str)]) -> ChecksumMap {
        entries
            .iter()
            .map(|(id, sum)| (id.to_string(), sum.to_string()))
            .collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<RecordId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_maps_yield_empty_delta() {
        let m = map(&[("A", "1"), ("B", "2")]);
        let delta = calculate_delta(&m, &m);
        assert!(delta.is_empty());
        assert_eq!(delta.change_count(), 0);
    }

    #[test]
    fn added_and_updated() {
        let old = map(&[("A", "1")]);
        let new = map(&[("A", "2"), ("B", "1")]);

        let delta = calculate_delta(&old, &new);
        assert_eq!(delta.added, set(&["B"]));
        assert_eq!(delta.updated, set(&["A"]));
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn removed_only() {
        let old = map(&[("A", "1"), ("C", "1")]);
        let new = map(&[("A", "1")]);

        let delta = calculate_delta(&old, &new);
        assert!(delta.added.is_empty());
        assert!(delta.updated.is_empty());
        assert_eq!(delta.removed, set(&["C"]));
    }

    #[test]
    fn from_changes_skips_unchanged_records() {
        let same = Record::new("A", json!({"code": "E1"}));
        let changed = Record::new("B", json!({"code": "E2-rev"}));
        let fresh = Record::new("X", json!({"code": "E9"}));

        let mut current = checksum_map(&[same.clone()]);
        current.insert("B".into(), "00000000".into());
        current.insert("C".into(), "11111111".into());

        let delta = Delta::from_changes(
            &current,
            &[same, changed, fresh],
            &["C".to_string(), "ghost".to_string()],
        );

        assert_eq!(delta.added, set(&["X"]));
        assert_eq!(delta.updated, set(&["B"]));
        assert_eq!(delta.removed, set(&["C"]));
    }

    #[test]
    fn removal_wins_over_upsert() {
        let current = map(&[("A", "1")]);
        let fetched = vec![Record::new("A", json!({"code": "new"}))];

        let delta = Delta::from_changes(&current, &fetched, &["A".to_string()]);
        assert!(delta.updated.is_empty());
        assert_eq!(delta.removed, set(&["A"]));
    }

    #[test]
    fn apply_to_map() {
        let a = Record::new("A", json!({"code": "E1"}));
        let b = Record::new("B", json!({"code": "E2"}));
        let mut records: BTreeMap<RecordId, Record> =
            [("A".to_string(), a), ("B".to_string(), b)].into();

        let a2 = Record::new("A", json!({"code": "E1-rev"}));
        let x = Record::new("X", json!({"code": "E9"}));
        let delta = Delta {
            added: set(&["X"]),
            updated: set(&["A"]),
            removed: set(&["B"]),
        };

        let touched = delta.apply_to(&mut records, &[a2.clone(), x.clone()]);
        assert_eq!(touched, 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records["A"], a2);
        assert_eq!(records["X"], x);
        assert!(!records.contains_key("B"));
    }
}
