//! Pure decisions behind the sync endpoints.
//!
//! Versions are compared semantically here rather than in SQL, where text
//! ordering would put "1.10.0" before "1.9.0".

use crate::db::{StoredUpdate, StoredVersion, UpdateAction};
use faultsync_engine::{compare_versions, increment_version, Record, RecordId, VersionPart};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Version seeded when the server has never published one.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Default lowest client version that can be served a delta.
pub const MIN_DELTA_VERSION: &str = "1.0.0";

/// Total records touched by the versions in `(client, latest]`.
pub fn change_count(versions: &[StoredVersion], client: &str, latest: &str) -> u64 {
    versions
        .iter()
        .filter(|v| in_range(&v.version, client, latest))
        .map(|v| v.change_count.max(0) as u64)
        .sum()
}

/// Versions in `(from, to]`, oldest first.
pub fn versions_between(versions: &[StoredVersion], from: &str, to: &str) -> Vec<String> {
    let mut selected: Vec<&str> = versions
        .iter()
        .map(|v| v.version.as_str())
        .filter(|v| in_range(v, from, to))
        .collect();
    selected.sort_by(|a, b| compare_versions(a, b));
    selected.into_iter().map(String::from).collect()
}

fn in_range(version: &str, lower_exclusive: &str, upper_inclusive: &str) -> bool {
    compare_versions(version, lower_exclusive) == Ordering::Greater
        && compare_versions(version, upper_inclusive) != Ordering::Greater
}

/// Whether a client at `from_version` must receive the whole dataset.
///
/// True for clients that have never synced, are below `min_delta`, or
/// predate the oldest version whose changes are still logged.
pub fn needs_full_sync(
    from_version: Option<&str>,
    oldest_tracked: Option<&str>,
    min_delta: &str,
) -> bool {
    let Some(from) = from_version.filter(|v| !v.trim().is_empty()) else {
        return true;
    };
    if compare_versions(from, min_delta) == Ordering::Less {
        return true;
    }
    match oldest_tracked {
        Some(oldest) => compare_versions(from, oldest) == Ordering::Less,
        None => true,
    }
}

/// Oldest version by semantic ordering.
pub fn oldest_version(versions: &[StoredVersion]) -> Option<&str> {
    versions
        .iter()
        .map(|v| v.version.as_str())
        .min_by(|a, b| compare_versions(a, b))
}

/// Collapse an ordered change log into the records to upsert and the ids to
/// remove. The last change to each id wins.
pub fn collapse_updates(updates: &[StoredUpdate]) -> (Vec<Record>, Vec<RecordId>) {
    let mut last: BTreeMap<&str, &StoredUpdate> = BTreeMap::new();
    for update in updates {
        last.insert(update.fault_id.as_str(), update);
    }

    let mut faults = Vec::new();
    let mut removed = Vec::new();
    for (id, update) in last {
        match (update.action, &update.payload) {
            (UpdateAction::Upsert, Some(payload)) => {
                faults.push(Record::new(id, payload.clone()));
            }
            (UpdateAction::Upsert, None) => {
                tracing::warn!(fault_id = id, update_id = update.id, "Upsert without payload skipped");
            }
            (UpdateAction::Remove, _) => removed.push(id.to_string()),
        }
    }
    (faults, removed)
}

/// Pick the version a publish creates.
///
/// An explicit version must be newer than the current one. Without one the
/// minor component of the current version is bumped.
pub fn next_version(current: Option<&str>, requested: Option<&str>) -> Result<String, String> {
    match (current, requested.map(str::trim).filter(|v| !v.is_empty())) {
        (None, Some(requested)) => Ok(requested.to_string()),
        (None, None) => Ok(INITIAL_VERSION.to_string()),
        (Some(current), Some(requested)) => {
            if compare_versions(requested, current) == Ordering::Greater {
                Ok(requested.to_string())
            } else {
                Err(format!(
                    "Version {} is not newer than current version {}",
                    requested, current
                ))
            }
        }
        (Some(current), None) => Ok(increment_version(current, VersionPart::Minor)),
    }
}
