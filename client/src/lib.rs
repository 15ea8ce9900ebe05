//! # Faultsync Client
//!
//! Offline store and sync service for the fault code dataset.
//!
//! - [`LocalStore`]: SQLite-backed records, settings and applied versions
//! - [`VersionManager`]: the applied version and staleness checks
//! - [`DeltaMerger`]: transactional application of downloaded changes
//! - [`SyncService`]: single-flight sync against a [`RemoteSource`], with
//!   progress events, cancellation, export/import and auto-sync
//!
//! ```no_run
//! use faultsync_client::{HttpRemote, LocalStore, SyncService};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), faultsync_client::SyncError> {
//! let store = LocalStore::open("faultsync.db").await?;
//! let remote = HttpRemote::new("https://faults.example.com/api", Duration::from_secs(30))?;
//! let service = SyncService::new(store, Arc::new(remote), 24);
//!
//! let result = service.sync_fault_database(false).await;
//! println!("synced: {:?}", result.version);
//! # Ok(())
//! # }
//! ```

mod auto_sync;
pub mod config;
pub mod error;
pub mod merger;
pub mod remote;
pub mod service;
pub mod store;
pub mod version;

pub use auto_sync::MIN_AUTO_SYNC_INTERVAL;
pub use config::{Config, ConfigError};
pub use error::{Result, SyncError};
pub use merger::{DeltaMerger, MergeOutcome};
pub use remote::{HttpRemote, RemoteSource};
pub use service::{SyncPhase, SyncProgress, SyncResult, SyncService, SyncStatus};
pub use store::{IndexField, LocalStore, StoreTxn};
pub use version::{LocalVersion, VersionManager, UNSYNCED_VERSION};
