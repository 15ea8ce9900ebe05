//! Error types for the sync client.

use thiserror::Error;

/// Failures surfaced by the local store and the sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Request failure or non-success response from the remote.
    #[error("{0}")]
    Network(String),

    /// A sync is already running.
    #[error("Sync already in progress")]
    Concurrency,

    /// Malformed bundle or record, or checksum mismatch.
    #[error(transparent)]
    Validation(#[from] faultsync_engine::Error),

    /// Local store unavailable or transaction failure.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The sync was aborted while talking to the remote.
    #[error("Sync aborted")]
    Cancelled,
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
