//! Sync endpoint routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use faultsync_engine::{CheckQuery, CheckResponse, FetchRequest, FetchResponse};

use crate::error::Result;
use crate::handlers::{handle_check, handle_fetch};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync", get(check_handler).post(fetch_handler))
}

/// GET /sync - Check for a newer dataset version.
async fn check_handler(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>> {
    let response = handle_check(&state.pool, query).await?;
    Ok(Json(response))
}

/// POST /sync - Download the dataset or the changes since a version.
///
/// Failures are reported in the fetch response shape so clients can read
/// the error text.
async fn fetch_handler(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> (StatusCode, Json<FetchResponse>) {
    match handle_fetch(&state.pool, request, &state.config.min_delta_version).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "Sync download failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FetchResponse::failure("Failed to download updates")),
            )
        }
    }
}
