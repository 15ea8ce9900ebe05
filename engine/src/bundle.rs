//! Export bundles for offline backup and restore.
//!
//! A bundle is a self-describing snapshot of the record set: version,
//! export time, record count, dataset checksum and the records themselves.
//! Records are kept sorted by id so that serialization is deterministic.

use crate::{checksum, error::Result, Error, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A point-in-time copy of the local dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// Dataset version the records belong to, if one was ever applied
    pub version: Option<String>,
    /// When the bundle was produced
    pub exported_at: DateTime<Utc>,
    /// Number of records in `faults`
    pub fault_count: usize,
    /// Dataset checksum over `faults`
    pub checksum: String,
    /// All records, sorted by id
    pub faults: Vec<Record>,
}

impl ExportBundle {
    /// Build a bundle from a record set.
    pub fn new(version: Option<String>, mut faults: Vec<Record>, exported_at: DateTime<Utc>) -> Self {
        faults.sort_by(|a, b| a.id.cmp(&b.id));
        let checksum = checksum::dataset_checksum(&faults);
        Self {
            version,
            exported_at,
            fault_count: faults.len(),
            checksum,
            faults,
        }
    }

    /// Verify the bundle is internally consistent.
    ///
    /// Checks every record structurally, rejects duplicate ids, verifies
    /// any content checksum the bundle carries, then the record count and
    /// the dataset checksum.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.faults.len());
        for record in &self.faults {
            record.validate()?;
            if !seen.insert(record.id.as_str()) {
                return Err(Error::DuplicateRecord(record.id.clone()));
            }
            if !record.content_checksum.is_empty() && !record.is_sealed() {
                return Err(Error::ContentChecksumMismatch(record.id.clone()));
            }
        }

        if self.fault_count != self.faults.len() {
            return Err(Error::CountMismatch {
                expected: self.fault_count,
                actual: self.faults.len(),
            });
        }

        let actual = checksum::dataset_checksum(self.sealed_records().iter());
        if actual != self.checksum {
            return Err(Error::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }

        Ok(())
    }

    /// Records with content checksums recomputed from their payloads.
    pub fn sealed_records(&self) -> Vec<Record> {
        self.faults.iter().cloned().map(Record::seal).collect()
    }

    /// Consume the bundle, yielding its sealed records.
    pub fn into_records(self) -> Vec<Record> {
        self.faults.into_iter().map(Record::seal).collect()
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidBundle(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// Input without a `faults` array is rejected before field-level
    /// deserialization so that the error names the real problem.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidBundle(e.to_string()))?;

        if !value.get("faults").is_some_and(|f| f.is_array()) {
            return Err(Error::InvalidBundle("Invalid import data format".into()));
        }

        serde_json::from_value(value).map_err(|e| Error::InvalidBundle(e.to_string()))
    }
}
