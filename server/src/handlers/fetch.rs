//! Fetch handler - serves the dataset or the changes since a version.

use super::current_or_seed;
use crate::db;
use crate::error::Result;
use crate::plan;
use faultsync_engine::{FetchRequest, FetchResponse};
use sqlx::PgPool;

/// Process a download request.
///
/// The response always brings the client to the current version; an older
/// `toVersion` is not served. Clients below `min_delta` get a full snapshot.
pub async fn handle_fetch(
    pool: &PgPool,
    request: FetchRequest,
    min_delta: &str,
) -> Result<FetchResponse> {
    let current = current_or_seed(pool).await?;

    if let Some(requested) = request.to_version.as_deref() {
        if requested != current.version {
            tracing::debug!(requested, serving = %current.version, "Serving current version");
        }
    }

    let versions = db::list_versions(pool).await?;
    let oldest = plan::oldest_version(&versions);

    let from = match request.from_version.as_deref() {
        Some(from) if !plan::needs_full_sync(Some(from), oldest, min_delta) => from,
        _ => {
            let faults = db::get_all_records(pool).await?;
            tracing::info!(
                from = ?request.from_version,
                version = %current.version,
                count = faults.len(),
                "Serving full snapshot"
            );
            return Ok(FetchResponse::full(current.version, faults));
        }
    };

    let range = plan::versions_between(&versions, from, &current.version);
    let updates = db::get_updates_for_versions(pool, &range).await?;
    let (faults, removed) = plan::collapse_updates(&updates);

    tracing::info!(
        from,
        version = %current.version,
        versions = range.len(),
        upserts = faults.len(),
        removed = removed.len(),
        "Serving delta"
    );

    Ok(FetchResponse::delta(current.version, faults, removed))
}
