//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use faultsync_client::version::{LAST_SYNC_KEY, LOCAL_VERSION_KEY};
use faultsync_client::{LocalStore, RemoteSource, SyncError, SyncService};
use faultsync_engine::{CheckResponse, FetchRequest, FetchResponse, Record};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Lets a test hold a remote call open.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-process remote answering from a script.
pub struct ScriptedRemote {
    check: Mutex<Result<CheckResponse, String>>,
    fetch: Mutex<Result<FetchResponse, String>>,
    check_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
    gate: Option<Arc<Gate>>,
    fetch_gate: Option<Arc<Gate>>,
}

impl ScriptedRemote {
    /// A remote with nothing new to offer.
    pub fn new() -> Self {
        Self {
            check: Mutex::new(Ok(no_update())),
            fetch: Mutex::new(Err("unexpected download".into())),
            check_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            fetch_gate: None,
        }
    }

    pub fn with_check(self, response: CheckResponse) -> Self {
        *self.check.lock() = Ok(response);
        self
    }

    pub fn with_check_error(self, message: &str) -> Self {
        *self.check.lock() = Err(message.to_string());
        self
    }

    pub fn with_fetch(self, response: FetchResponse) -> Self {
        *self.fetch.lock() = Ok(response);
        self
    }

    pub fn with_fetch_error(self, message: &str) -> Self {
        *self.fetch.lock() = Err(message.to_string());
        self
    }

    /// Hold the update check open.
    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Hold the download open.
    pub fn with_fetch_gate(mut self, gate: Arc<Gate>) -> Self {
        self.fetch_gate = Some(gate);
        self
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn check(&self, _current_version: &str) -> Result<CheckResponse, SyncError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check.lock().clone().map_err(SyncError::Network)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SyncError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(gate) = &self.fetch_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.fetch.lock().clone().map_err(SyncError::Network)
    }
}

pub fn no_update() -> CheckResponse {
    CheckResponse {
        has_update: false,
        current_version: None,
        latest_version: None,
        change_count: 0,
        changelog: None,
        released_at: None,
    }
}

pub fn update_to(latest: &str, change_count: u64) -> CheckResponse {
    CheckResponse {
        has_update: true,
        current_version: None,
        latest_version: Some(latest.to_string()),
        change_count,
        changelog: Some(vec![format!("Release {}", latest)]),
        released_at: Some(Utc::now()),
    }
}

pub fn fault(id: &str, code: &str) -> Record {
    Record::new(
        id,
        json!({
            "code": code,
            "brand": "DSE",
            "model": "DSE 7320",
            "severity": "warning",
            "title": format!("Fault {}", code),
        }),
    )
}

/// An in-memory store holding `records` at `version`, last synced
/// `hours_ago` hours ago.
pub async fn seeded_store(records: &[Record], version: Option<&str>, hours_ago: i64) -> LocalStore {
    let store = LocalStore::open_in_memory().await.unwrap();

    let mut txn = store.begin().await.unwrap();
    txn.upsert(records).await.unwrap();
    if let Some(version) = version {
        txn.put_setting(LOCAL_VERSION_KEY, version).await.unwrap();
        let at = Utc::now() - TimeDelta::hours(hours_ago);
        txn.put_setting(LAST_SYNC_KEY, &at.to_rfc3339()).await.unwrap();
    }
    txn.commit().await.unwrap();

    store
}

pub fn service(store: &LocalStore, remote: &Arc<ScriptedRemote>) -> Arc<SyncService> {
    Arc::new(SyncService::new(store.clone(), remote.clone(), 24))
}
