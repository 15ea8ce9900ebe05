//! Version publishing routes.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use faultsync_engine::{compare_versions, DatasetVersion};

use crate::db;
use crate::error::Result;
use crate::handlers::{handle_publish, PublishRequest};
use crate::AppState;

/// Create version routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/versions", get(list_handler).post(publish_handler))
}

/// GET /versions - Published versions, newest first.
async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<DatasetVersion>>> {
    let mut versions: Vec<DatasetVersion> = db::list_versions(&state.pool)
        .await?
        .iter()
        .map(|v| v.to_dataset_version())
        .collect();
    versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
    Ok(Json(versions))
}

/// POST /versions - Publish a change list as a new version.
async fn publish_handler(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<(StatusCode, Json<DatasetVersion>)> {
    let version = handle_publish(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(version)))
}
