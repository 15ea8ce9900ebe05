//! Error types for the sync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the sync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Record errors
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("duplicate record id: {0}")]
    DuplicateRecord(RecordId),

    #[error("content checksum mismatch for record: {0}")]
    ContentChecksumMismatch(RecordId),

    // Bundle errors
    #[error("{0}")]
    InvalidBundle(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("fault count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
