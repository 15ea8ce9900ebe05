//! Tracking of the locally applied dataset version.

use crate::error::Result;
use crate::store::{LocalStore, StoreTxn};
use chrono::{DateTime, TimeDelta, Utc};
use faultsync_engine::dataset_checksum;
use serde::{Deserialize, Serialize};

/// Settings key holding the applied version string.
pub const LOCAL_VERSION_KEY: &str = "localVersion";
/// Settings key holding the time of the last successful sync (RFC 3339).
pub const LAST_SYNC_KEY: &str = "lastSyncTimestamp";

/// Version the client reports when it has never synced.
pub const UNSYNCED_VERSION: &str = "0.0.0";

/// The applied version and when it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVersion {
    pub version: String,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Reads and writes the applied version and last sync time.
///
/// Reads never fail: an unreadable settings table is logged and treated as
/// "never synced".
#[derive(Debug, Clone)]
pub struct VersionManager {
    store: LocalStore,
}

impl VersionManager {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// The applied version, if any.
    pub async fn get_local_version(&self) -> Option<String> {
        match self.store.get_setting(LOCAL_VERSION_KEY).await {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read local version");
                None
            }
        }
    }

    /// When the last successful sync completed, if ever.
    pub async fn get_last_sync_time(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get_setting(LAST_SYNC_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read last sync time");
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "Ignoring malformed last sync time");
                None
            }
        }
    }

    pub async fn get(&self) -> Option<LocalVersion> {
        let version = self.get_local_version().await?;
        Some(LocalVersion {
            version,
            last_sync: self.get_last_sync_time().await,
        })
    }

    /// Store `version` as applied now.
    pub async fn set_local_version(&self, version: &str) -> Result<()> {
        let mut txn = self.store.begin().await?;
        Self::stage(&mut txn, version, Utc::now()).await?;
        txn.commit().await
    }

    /// Write the applied version and sync time inside an open transaction.
    pub async fn stage(txn: &mut StoreTxn, version: &str, at: DateTime<Utc>) -> Result<()> {
        txn.put_setting(LOCAL_VERSION_KEY, version).await?;
        txn.put_setting(LAST_SYNC_KEY, &at.to_rfc3339()).await?;
        Ok(())
    }

    /// Whether a sync is due: never synced, or last synced more than
    /// `max_age_hours` ago.
    pub async fn is_sync_needed(&self, max_age_hours: u64) -> bool {
        is_stale(self.get_last_sync_time().await, Utc::now(), max_age_hours)
    }

    /// Checksum of the records currently in the store.
    pub async fn generate_checksum(&self) -> Result<String> {
        let records = self.store.all().await?;
        Ok(dataset_checksum(&records))
    }
}

/// Staleness rule behind [`VersionManager::is_sync_needed`].
pub fn is_stale(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age_hours: u64) -> bool {
    let Some(last_sync) = last_sync else {
        return true;
    };
    let max_age = i64::try_from(max_age_hours)
        .ok()
        .and_then(TimeDelta::try_hours)
        .unwrap_or(TimeDelta::MAX);
    now - last_sync > max_age
}
