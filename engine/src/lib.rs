//! # Faultsync Engine
//!
//! Deterministic building blocks for keeping an offline copy of the fault
//! code dataset in step with the authoritative remote copy.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about files, databases or network
//! - **Deterministic**: the same record set always yields the same checksum,
//!   delta and bundle bytes, whatever order it was enumerated in
//! - **Total**: version parsing never fails, so version comparison is a
//!   total order over arbitrary strings
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is an id, an opaque JSON payload and a content checksum
//! derived from the payload.
//!
//! ### Versions
//!
//! Datasets are versioned with semantic triples ([`SemVer`]). The remote
//! publishes [`DatasetVersion`] metadata; the client only remembers the
//! version string it last applied.
//!
//! ### Checksums and deltas
//!
//! [`dataset_checksum`] digests a whole record set. [`calculate_delta`]
//! compares two id→checksum maps and yields the [`Delta`] of added, updated
//! and removed ids.
//!
//! ## Quick Start
//!
//! ```rust
//! use faultsync_engine::{calculate_delta, checksum_map, is_newer_version, Record};
//! use serde_json::json;
//!
//! assert!(is_newer_version("1.3.0", "1.2.9"));
//!
//! let old = vec![Record::new("dse-e001", json!({"code": "E001"}))];
//! let new = vec![
//!     Record::new("dse-e001", json!({"code": "E001", "severity": "critical"})),
//!     Record::new("dse-e002", json!({"code": "E002"})),
//! ];
//!
//! let delta = calculate_delta(&checksum_map(&old), &checksum_map(&new));
//! assert!(delta.added.contains("dse-e002"));
//! assert!(delta.updated.contains("dse-e001"));
//! assert!(delta.removed.is_empty());
//! ```
//!
//! ## Persistence
//!
//! Use [`ExportBundle`] to move a record set between devices or into a
//! backup. Bundles carry their own checksum and are verified on import.

pub mod bundle;
pub mod checksum;
pub mod delta;
pub mod error;
pub mod protocol;
pub mod record;
pub mod version;

// Re-export main types at crate root
pub use bundle::ExportBundle;
pub use checksum::{checksum_of_pairs, content_checksum, dataset_checksum};
pub use delta::{calculate_delta, checksum_map, ChecksumMap, Delta};
pub use error::Error;
pub use protocol::{CheckQuery, CheckResponse, FetchRequest, FetchResponse};
pub use record::{Record, INDEXED_FIELDS};
pub use version::{
    compare_versions, format_version_info, increment_version, is_newer_version, parse_version,
    DatasetVersion, SemVer, VersionComparison, VersionPart,
};

/// Type aliases for clarity
pub type RecordId = String;
