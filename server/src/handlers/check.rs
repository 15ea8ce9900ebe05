//! Check handler - tells a client whether a newer dataset exists.

use super::is_unique_violation;
use crate::db::{self, StoredVersion};
use crate::error::Result;
use crate::plan;
use chrono::Utc;
use faultsync_engine::{checksum_of_pairs, is_newer_version, CheckQuery, CheckResponse};
use sqlx::PgPool;

/// Version reported for clients that send none.
const UNSYNCED_VERSION: &str = "0.0.0";

/// Process an update check.
pub async fn handle_check(pool: &PgPool, query: CheckQuery) -> Result<CheckResponse> {
    let client_version = query
        .version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNSYNCED_VERSION.to_string());

    let latest = current_or_seed(pool).await?;
    let has_update = is_newer_version(&latest.version, &client_version);

    let change_count = if has_update {
        let versions = db::list_versions(pool).await?;
        plan::change_count(&versions, &client_version, &latest.version)
    } else {
        0
    };

    tracing::debug!(
        client = %client_version,
        latest = %latest.version,
        has_update,
        change_count,
        "Update check"
    );

    Ok(CheckResponse {
        has_update,
        current_version: Some(client_version),
        latest_version: Some(latest.version),
        change_count,
        changelog: (!latest.changelog.is_empty()).then_some(latest.changelog),
        released_at: Some(latest.released_at),
    })
}

/// The current version, seeding the initial one on an empty server.
pub async fn current_or_seed(pool: &PgPool) -> Result<StoredVersion> {
    if let Some(current) = db::get_current_version(pool).await? {
        return Ok(current);
    }

    let checksums = db::get_record_checksums(pool).await?;
    let seed = StoredVersion {
        version: plan::INITIAL_VERSION.to_string(),
        change_count: 0,
        record_count: checksums.len() as i64,
        checksum: checksum_of_pairs(checksums.iter().map(|(id, c)| (id.as_str(), c.as_str()))),
        changelog: Vec::new(),
        released_at: Utc::now(),
        is_current: true,
    };

    match db::seed_initial_version(pool, &seed).await {
        Ok(true) => tracing::info!(version = %seed.version, "Seeded initial dataset version"),
        Ok(false) => {}
        // Another request seeded first.
        Err(e) if is_unique_violation(&e) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(db::get_current_version(pool).await?.unwrap_or(seed))
}
