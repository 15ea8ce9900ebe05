//! Record types for the synchronized dataset.

use crate::{checksum, error::Result, Error, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload fields projected into the local store's secondary indexes.
pub const INDEXED_FIELDS: [&str; 5] = ["brand", "model", "category", "severity", "code"];

/// A dataset record.
///
/// The payload is opaque to the engine. `content_checksum` is derived from
/// the payload and is what delta computation compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable unique identifier
    pub id: RecordId,
    /// Record content (JSON value)
    pub payload: Value,
    /// Digest of the canonical payload
    #[serde(default)]
    pub content_checksum: String,
}

impl Record {
    /// Create a record, deriving its content checksum.
    pub fn new(id: impl Into<RecordId>, payload: Value) -> Self {
        let content_checksum = checksum::content_checksum(&payload);
        Self {
            id: id.into(),
            payload,
            content_checksum,
        }
    }

    /// Recompute the content checksum from the payload.
    ///
    /// Used on every record that arrives from outside the store.
    pub fn seal(mut self) -> Self {
        self.content_checksum = checksum::content_checksum(&self.payload);
        self
    }

    /// Whether the stored checksum matches the payload.
    pub fn is_sealed(&self) -> bool {
        self.content_checksum == checksum::content_checksum(&self.payload)
    }

    /// Structural validation: non-empty id and a non-null payload.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidRecord("record id is empty".into()));
        }
        if self.payload.is_null() {
            return Err(Error::InvalidRecord(format!(
                "record {} has no payload",
                self.id
            )));
        }
        Ok(())
    }

    /// Top-level string field of the payload, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_record() {
        let record = Record::new("dse-e001", json!({"code": "E001", "brand": "DSE"}));

        assert_eq!(record.id, "dse-e001");
        assert_eq!(record.content_checksum.len(), 8);
        assert!(record.is_sealed());
        assert_eq!(record.field("brand"), Some("DSE"));
        assert_eq!(record.field("missing"), None);
    }

    #[test]
    fn seal_repairs_stale_checksum() {
        let mut record = Record::new("r1", json!({"code": "E1"}));
        record.payload = json!({"code": "E2"});
        assert!(!record.is_sealed());

        let record = record.seal();
        assert!(record.is_sealed());
    }

    #[test]
    fn validate_rejects_empty_id_and_null_payload() {
        assert!(matches!(
            Record::new(" ", json!({})).validate(),
            Err(Error::InvalidRecord(_))
        ));
        assert!(matches!(
            Record::new("r1", Value::Null).validate(),
            Err(Error::InvalidRecord(_))
        ));
        assert!(Record::new("r1", json!({"code": "E1"})).validate().is_ok());
    }

    #[test]
    fn missing_checksum_deserializes_empty() {
        let record: Record =
            serde_json::from_str(r#"{"id": "r1", "payload": {"code": "E1"}}"#).unwrap();
        assert!(record.content_checksum.is_empty());
        assert!(record.seal().is_sealed());
    }

    #[test]
    fn serialization_format() {
        let record = Record::new("r1", json!({"code": "E1"}));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("contentChecksum")); // camelCase

        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }
}
