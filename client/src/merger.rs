//! Applying downloaded changes to the local store.

use crate::error::Result;
use crate::store::{LocalStore, StoreTxn};
use faultsync_engine::{dataset_checksum, Delta, Record, RecordId};
use std::collections::BTreeMap;

/// What a merge did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records inserted or replaced
    pub written: usize,
    /// Records deleted
    pub removed: usize,
    /// Records in the store after the merge
    pub record_count: usize,
    /// Dataset checksum after the merge
    pub checksum: String,
}

/// Merges fetched records into the local store.
///
/// The `*_in` variants stage the merge in a caller-owned transaction so it
/// can be committed together with the version update.
#[derive(Debug, Clone)]
pub struct DeltaMerger {
    store: LocalStore,
}

impl DeltaMerger {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Apply `delta`, taking upserted records from `fetched`.
    pub async fn apply_delta(&self, delta: &Delta, fetched: &[Record]) -> Result<MergeOutcome> {
        let mut txn = self.store.begin().await?;
        let outcome = Self::apply_delta_in(&mut txn, delta, fetched).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Apply a server delta expressed as changed records plus removed ids.
    pub async fn apply_changes(&self, fetched: &[Record], removed: &[RecordId]) -> Result<MergeOutcome> {
        let mut txn = self.store.begin().await?;
        let outcome = Self::apply_changes_in(&mut txn, fetched, removed).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Replace the entire stored set with `records`.
    pub async fn apply_full_snapshot(&self, records: &[Record]) -> Result<MergeOutcome> {
        let mut txn = self.store.begin().await?;
        let outcome = Self::apply_full_snapshot_in(&mut txn, records).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    pub async fn apply_delta_in(
        txn: &mut StoreTxn,
        delta: &Delta,
        fetched: &[Record],
    ) -> Result<MergeOutcome> {
        for record in fetched {
            record.validate()?;
        }

        let mut merged: BTreeMap<RecordId, Record> = txn
            .all()
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        delta.apply_to(&mut merged, fetched);

        let upserts: Vec<Record> = delta
            .upserts()
            .filter_map(|id| merged.get(id))
            .cloned()
            .collect();
        let written = txn.upsert(&upserts).await?;
        let removed = txn.remove(&delta.removed).await?;

        tracing::debug!(written, removed, total = merged.len(), "Applied delta");

        Ok(MergeOutcome {
            written,
            removed,
            record_count: merged.len(),
            checksum: dataset_checksum(merged.values()),
        })
    }

    pub async fn apply_changes_in(
        txn: &mut StoreTxn,
        fetched: &[Record],
        removed: &[RecordId],
    ) -> Result<MergeOutcome> {
        let current = txn.checksum_map().await?;
        let delta = Delta::from_changes(&current, fetched, removed);
        Self::apply_delta_in(txn, &delta, fetched).await
    }

    pub async fn apply_full_snapshot_in(
        txn: &mut StoreTxn,
        records: &[Record],
    ) -> Result<MergeOutcome> {
        for record in records {
            record.validate()?;
        }

        // Later duplicates win, as they would with sequential upserts.
        let snapshot: Vec<Record> = records
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect::<BTreeMap<&str, &Record>>()
            .into_values()
            .cloned()
            .collect();
        let checksum = dataset_checksum(&snapshot);

        let removed = txn.clear().await? as usize;
        let written = txn.upsert(&snapshot).await?;

        tracing::debug!(written, replaced = removed, "Applied full snapshot");

        Ok(MergeOutcome {
            written,
            removed,
            record_count: snapshot.len(),
            checksum,
        })
    }
}
