//! Wire types for the remote sync endpoints.
//!
//! - `GET /sync?version=<semver>` answers with [`CheckResponse`]
//! - `POST /sync` takes a [`FetchRequest`] and answers with [`FetchResponse`]

use crate::{Record, RecordId, VersionComparison};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string of the update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckQuery {
    /// Version the client currently holds
    pub version: Option<String>,
}

/// Response of the update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub has_update: bool,
    /// Echo of the client version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub change_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
}

impl CheckResponse {
    /// Interpret the response from the point of view of `current_version`.
    ///
    /// A missing latest version means the client is current.
    pub fn into_comparison(self, current_version: &str) -> VersionComparison {
        VersionComparison {
            has_update: self.has_update,
            current_version: current_version.to_string(),
            latest_version: self
                .latest_version
                .unwrap_or_else(|| current_version.to_string()),
            change_count: self.change_count,
            changelog: self.changelog,
        }
    }
}

/// Body of the download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default)]
    pub from_version: Option<String>,
    #[serde(default)]
    pub to_version: Option<String>,
}

impl FetchRequest {
    pub fn new(from_version: impl Into<String>, to_version: impl Into<String>) -> Self {
        Self {
            from_version: Some(from_version.into()),
            to_version: Some(to_version.into()),
        }
    }
}

/// Response of the download request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default)]
    pub version: Option<String>,
    /// Full set (full sync) or changed records (delta)
    #[serde(default)]
    pub faults: Vec<Record>,
    /// Ids removed since `fromVersion` (delta only)
    #[serde(default)]
    pub removed: Vec<RecordId>,
    #[serde(default)]
    pub is_full_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResponse {
    /// A full snapshot of the dataset at `version`.
    pub fn full(version: impl Into<String>, faults: Vec<Record>) -> Self {
        Self {
            success: true,
            version: Some(version.into()),
            fault_count: Some(faults.len()),
            faults,
            removed: Vec::new(),
            is_full_sync: true,
            error: None,
        }
    }

    /// Changes between the client's version and `version`.
    pub fn delta(version: impl Into<String>, faults: Vec<Record>, removed: Vec<RecordId>) -> Self {
        Self {
            success: true,
            version: Some(version.into()),
            fault_count: Some(faults.len()),
            faults,
            removed,
            is_full_sync: false,
            error: None,
        }
    }

    /// A failed download.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            version: None,
            faults: Vec::new(),
            removed: Vec::new(),
            is_full_sync: false,
            fault_count: None,
            error: Some(message.into()),
        }
    }
}
