//! Periodic background sync.

use crate::service::SyncService;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest interval auto-sync accepts. Shorter requests are raised to it.
pub const MIN_AUTO_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Handle of the running auto-sync task.
pub(crate) struct AutoSyncTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    interval: Duration,
}

impl SyncService {
    /// Run a non-forced sync now and then every `interval`.
    ///
    /// Replaces any auto-sync already running. The task holds only a weak
    /// reference, so it ends by itself once the service is dropped.
    /// Intervals below [`MIN_AUTO_SYNC_INTERVAL`] are raised to it.
    pub fn start_auto_sync(self: &Arc<Self>, interval: Duration) {
        self.stop_auto_sync();

        if interval < MIN_AUTO_SYNC_INTERVAL {
            tracing::warn!(requested = ?interval, "Auto-sync interval too short, using minimum");
        }
        let interval = interval.max(MIN_AUTO_SYNC_INTERVAL);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::downgrade(self), interval, cancel.clone()));

        tracing::info!(interval_secs = interval.as_secs(), "Auto-sync started");
        *self.auto_sync.lock() = Some(AutoSyncTask {
            cancel,
            handle,
            interval,
        });
    }

    /// Stop the auto-sync task. A sync it already started runs to completion.
    pub fn stop_auto_sync(&self) {
        if let Some(task) = self.auto_sync.lock().take() {
            task.cancel.cancel();
            tracing::info!("Auto-sync stopped");
        }
    }

    /// Interval of the running auto-sync, if any.
    pub fn auto_sync_interval(&self) -> Option<Duration> {
        self.auto_sync
            .lock()
            .as_ref()
            .filter(|task| !task.handle.is_finished())
            .map(|task| task.interval)
    }
}

async fn run(service: Weak<SyncService>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(service) = service.upgrade() else {
                    break;
                };
                let result = service.sync_fault_database(false).await;
                if !result.success {
                    tracing::warn!(error = ?result.error, "Auto-sync failed");
                }
            }
        }
    }

    tracing::debug!("Auto-sync task exited");
}
