//! Publish handler - records a new dataset version from a change list.

use super::is_unique_violation;
use crate::db::{self, StoredVersion, UpdateAction};
use crate::error::{AppError, Result};
use crate::plan;
use chrono::Utc;
use faultsync_engine::{checksum_of_pairs, DatasetVersion, Record, RecordId};
use serde::Deserialize;
use sqlx::PgPool;

/// Request body for publishing a version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Explicit version; defaults to a minor bump of the current one
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub changelog: Vec<String>,
    /// Records to insert or replace
    #[serde(default)]
    pub upserts: Vec<Record>,
    /// Ids to delete
    #[serde(default)]
    pub removed: Vec<RecordId>,
}

/// Apply a change list and make it the current version.
///
/// Records, change log and version row are written in one transaction.
pub async fn handle_publish(pool: &PgPool, request: PublishRequest) -> Result<DatasetVersion> {
    if request.upserts.is_empty() && request.removed.is_empty() {
        return Err(AppError::BadRequest("No changes to publish".to_string()));
    }

    let upserts: Vec<Record> = request.upserts.into_iter().map(Record::seal).collect();
    for record in &upserts {
        record.validate()?;
    }

    let mut tx = pool.begin().await?;

    let current = db::get_current_version(&mut *tx).await?;
    let version = plan::next_version(
        current.as_ref().map(|v| v.version.as_str()),
        request.version.as_deref(),
    )
    .map_err(AppError::Conflict)?;

    for record in &upserts {
        db::upsert_record(&mut *tx, record).await?;
    }
    let mut removed = Vec::new();
    for id in &request.removed {
        if db::delete_record(&mut *tx, id).await? {
            removed.push(id);
        }
    }

    let checksums = db::get_record_checksums(&mut *tx).await?;
    let stored = StoredVersion {
        version,
        change_count: (upserts.len() + removed.len()) as i64,
        record_count: checksums.len() as i64,
        checksum: checksum_of_pairs(checksums.iter().map(|(id, c)| (id.as_str(), c.as_str()))),
        changelog: request.changelog,
        released_at: Utc::now(),
        is_current: true,
    };

    db::insert_current_version(&mut *tx, &stored)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Version {} was published concurrently", stored.version))
            } else {
                e.into()
            }
        })?;

    for record in &upserts {
        db::insert_update(
            &mut *tx,
            &stored.version,
            &record.id,
            UpdateAction::Upsert,
            Some(&record.payload),
        )
        .await?;
    }
    for id in removed {
        db::insert_update(&mut *tx, &stored.version, id, UpdateAction::Remove, None).await?;
    }

    tx.commit().await?;

    tracing::info!(
        version = %stored.version,
        changes = stored.change_count,
        records = stored.record_count,
        checksum = %stored.checksum,
        "Published dataset version"
    );

    Ok(stored.to_dataset_version())
}
