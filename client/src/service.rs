//! Sync orchestration.
//!
//! [`SyncService`] drives one sync at a time through
//! check → download → apply → record version, publishing progress on a
//! broadcast channel. A second sync (or an import) started while one is in
//! flight is rejected, not queued.

use crate::auto_sync::AutoSyncTask;
use crate::error::{Result, SyncError};
use crate::merger::{DeltaMerger, MergeOutcome};
use crate::remote::RemoteSource;
use crate::store::LocalStore;
use crate::version::{VersionManager, UNSYNCED_VERSION};
use chrono::{DateTime, Utc};
use faultsync_engine::{
    DatasetVersion, ExportBundle, FetchRequest, FetchResponse, Record, VersionComparison,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the progress channel. Slow subscribers miss old events.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Stage of the sync state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Checking,
    Downloading,
    Applying,
    Complete,
    Error,
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub phase: SyncPhase,
    /// 0 to 100
    pub progress: u8,
    pub message: String,
}

/// Outcome of a sync or import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faults_updated: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_full_sync: Option<bool>,
}

impl SyncResult {
    /// Nothing to do: the store already holds `version`.
    pub fn up_to_date(version: impl Into<String>) -> Self {
        Self {
            success: true,
            version: Some(version.into()),
            faults_updated: Some(0),
            error: None,
            is_full_sync: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            version: None,
            faults_updated: None,
            error: Some(error.into()),
            is_full_sync: None,
        }
    }
}

/// Snapshot of the client's sync state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub current_version: Option<String>,
    pub is_outdated: bool,
    pub is_syncing: bool,
    pub phase: SyncPhase,
}

#[derive(Debug, Default)]
struct SyncState {
    phase: SyncPhase,
    /// Cancellation handle of the sync in flight, if any
    in_flight: Option<CancellationToken>,
}

/// Single-flight guard. Resets the state to idle when dropped, whichever
/// way the sync ends.
struct InFlight<'a> {
    service: &'a SyncService,
    token: CancellationToken,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.service.state.lock();
        state.in_flight = None;
        state.phase = SyncPhase::Idle;
    }
}

/// Keeps the local fault dataset in step with a [`RemoteSource`].
pub struct SyncService {
    store: LocalStore,
    versions: VersionManager,
    remote: Arc<dyn RemoteSource>,
    max_age_hours: u64,
    state: Mutex<SyncState>,
    events: broadcast::Sender<SyncProgress>,
    pub(crate) auto_sync: Mutex<Option<AutoSyncTask>>,
}

impl SyncService {
    /// `max_age_hours` is how old the last sync may get before a non-forced
    /// sync talks to the remote again.
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteSource>, max_age_hours: u64) -> Self {
        let (events, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            versions: VersionManager::new(store.clone()),
            store,
            remote,
            max_age_hours,
            state: Mutex::new(SyncState::default()),
            events,
            auto_sync: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    /// Receive progress notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncProgress> {
        self.events.subscribe()
    }

    pub fn is_sync_in_progress(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase
    }

    /// Cancel the sync in flight, if any.
    ///
    /// A sync waiting on the remote ends promptly with "Sync aborted". Once
    /// the apply step has started it runs to completion, so the store is
    /// never left half-merged.
    pub fn abort_sync(&self) {
        if let Some(token) = &self.state.lock().in_flight {
            tracing::info!("Aborting sync");
            token.cancel();
        }
    }

    pub async fn status(&self) -> SyncStatus {
        let (is_syncing, phase) = {
            let state = self.state.lock();
            (state.in_flight.is_some(), state.phase)
        };
        SyncStatus {
            last_sync: self.versions.get_last_sync_time().await,
            current_version: self.versions.get_local_version().await,
            is_outdated: self.versions.is_sync_needed(self.max_age_hours).await,
            is_syncing,
            phase,
        }
    }

    /// Ask the remote whether a newer dataset exists.
    pub async fn check_for_updates(&self) -> Result<VersionComparison> {
        let current = self
            .versions
            .get_local_version()
            .await
            .unwrap_or_else(|| UNSYNCED_VERSION.to_string());

        let response = self.remote.check(&current).await?;
        let comparison = response.into_comparison(&current);

        tracing::debug!(
            current = %comparison.current_version,
            latest = %comparison.latest_version,
            has_update = comparison.has_update,
            "Update check complete"
        );
        Ok(comparison)
    }

    /// Bring the local dataset up to date.
    ///
    /// Unless `force` is set, a store that synced recently is left alone
    /// without contacting the remote. Never panics or returns an error;
    /// failures are reported in the result.
    pub async fn sync_fault_database(&self, force: bool) -> SyncResult {
        let flight = match self.begin_flight() {
            Ok(flight) => flight,
            Err(e) => {
                tracing::warn!("Sync requested while another is in progress");
                return SyncResult::failure(e.to_string());
            }
        };

        match self.run_sync(&flight.token, force).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Sync failed");
                self.emit(SyncPhase::Error, 0, format!("Sync failed: {}", e));
                SyncResult::failure(e.to_string())
            }
        }
    }

    /// Every stored record plus the applied version, as a portable bundle.
    pub async fn export_fault_data(&self) -> Result<ExportBundle> {
        let faults = self.store.all().await?;
        let version = self.versions.get_local_version().await;
        tracing::info!(count = faults.len(), ?version, "Exporting fault data");
        Ok(ExportBundle::new(version, faults, Utc::now()))
    }

    /// Replace the local dataset with the contents of an exported bundle.
    ///
    /// The bundle is fully validated before anything is written.
    pub async fn import_fault_data(&self, data: &str) -> SyncResult {
        let _flight = match self.begin_flight() {
            Ok(flight) => flight,
            Err(e) => return SyncResult::failure(e.to_string()),
        };

        match self.run_import(data).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Import failed");
                SyncResult::failure(e.to_string())
            }
        }
    }

    fn begin_flight(&self) -> Result<InFlight<'_>> {
        let mut state = self.state.lock();
        if state.in_flight.is_some() {
            return Err(SyncError::Concurrency);
        }
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        Ok(InFlight {
            service: self,
            token,
        })
    }

    fn emit(&self, phase: SyncPhase, progress: u8, message: impl Into<String>) {
        let message = message.into();
        self.state.lock().phase = phase;
        tracing::debug!(?phase, progress, %message, "Sync progress");
        // No subscribers is fine.
        let _ = self.events.send(SyncProgress {
            phase,
            progress,
            message,
        });
    }

    async fn run_sync(&self, token: &CancellationToken, force: bool) -> Result<SyncResult> {
        let local_version = self.versions.get_local_version().await;

        if !force {
            if let Some(version) = &local_version {
                if !self.versions.is_sync_needed(self.max_age_hours).await {
                    tracing::debug!(%version, "Local dataset is fresh, skipping sync");
                    return Ok(SyncResult::up_to_date(version.clone()));
                }
            }
        }

        tracing::info!(?local_version, force, "Starting sync");

        self.emit(SyncPhase::Checking, 10, "Checking for updates...");
        let comparison = cancellable(token, self.check_for_updates()).await?;

        if !comparison.has_update && !force {
            self.emit(SyncPhase::Complete, 100, "Already up to date");
            return Ok(SyncResult::up_to_date(comparison.current_version));
        }

        self.emit(
            SyncPhase::Downloading,
            30,
            format!("Downloading {} updates...", comparison.change_count),
        );
        let request = FetchRequest::new(
            local_version.as_deref().unwrap_or(UNSYNCED_VERSION),
            comparison.latest_version.as_str(),
        );
        let response = cancellable(token, self.remote.fetch(&request)).await?;
        let FetchResponse {
            success,
            version,
            faults,
            removed,
            is_full_sync,
            error,
            ..
        } = response;

        if !success {
            return Err(SyncError::Network(
                error.unwrap_or_else(|| "Sync failed".to_string()),
            ));
        }
        let version = version.unwrap_or_else(|| comparison.latest_version.clone());
        let records: Vec<Record> = faults.into_iter().map(Record::seal).collect();

        // Last point at which an abort is honored.
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.emit(SyncPhase::Applying, 60, "Applying updates...");
        let mut txn = self.store.begin().await?;
        let outcome = if is_full_sync {
            if records.is_empty() {
                tracing::warn!(%version, "Remote sent an empty full snapshot, keeping local records");
                DeltaMerger::apply_changes_in(&mut txn, &[], &[]).await?
            } else {
                DeltaMerger::apply_full_snapshot_in(&mut txn, &records).await?
            }
        } else {
            DeltaMerger::apply_changes_in(&mut txn, &records, &removed).await?
        };

        self.emit(SyncPhase::Applying, 90, "Updating version info...");
        let now = Utc::now();
        VersionManager::stage(&mut txn, &version, now).await?;
        txn.record_version(&applied_version(
            &version,
            &outcome,
            now,
            comparison.changelog.unwrap_or_default(),
        ))
        .await?;
        txn.commit().await?;

        tracing::info!(
            %version,
            is_full_sync,
            written = outcome.written,
            removed = outcome.removed,
            total = outcome.record_count,
            "Sync complete"
        );
        self.emit(SyncPhase::Complete, 100, format!("Updated to v{}", version));

        Ok(SyncResult {
            success: true,
            version: Some(version),
            faults_updated: Some(faults_updated(&outcome, is_full_sync)),
            error: None,
            is_full_sync: Some(is_full_sync),
        })
    }

    async fn run_import(&self, data: &str) -> Result<SyncResult> {
        let bundle = ExportBundle::from_json(data)?;
        bundle.validate()?;

        let version = bundle.version.clone();
        let records = bundle.into_records();

        let mut txn = self.store.begin().await?;
        let outcome = DeltaMerger::apply_full_snapshot_in(&mut txn, &records).await?;
        if let Some(version) = &version {
            let now = Utc::now();
            VersionManager::stage(&mut txn, version, now).await?;
            txn.record_version(&applied_version(version, &outcome, now, Vec::new()))
                .await?;
        }
        txn.commit().await?;

        tracing::info!(count = outcome.record_count, ?version, "Imported fault data");

        Ok(SyncResult {
            success: true,
            version,
            faults_updated: Some(outcome.written),
            error: None,
            is_full_sync: Some(true),
        })
    }
}

/// Records a sync changed. A full snapshot replaces the store, so only its
/// records count; rows it cleared are not reported again as removals.
fn faults_updated(outcome: &MergeOutcome, is_full_sync: bool) -> usize {
    if is_full_sync {
        outcome.written
    } else {
        outcome.written + outcome.removed
    }
}

fn applied_version(
    version: &str,
    outcome: &MergeOutcome,
    applied_at: DateTime<Utc>,
    changelog: Vec<String>,
) -> DatasetVersion {
    DatasetVersion {
        version: version.to_string(),
        record_count: outcome.record_count as u64,
        checksum: outcome.checksum.clone(),
        released_at: applied_at,
        is_current: true,
        changelog,
    }
}

/// Run `fut` unless `token` is cancelled first.
async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}
