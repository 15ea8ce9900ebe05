//! Liveness and dataset status.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db;
use crate::AppState;

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database cannot be read
    pub status: &'static str,
    /// Server build version
    pub version: &'static str,
    /// Dataset version clients are currently served
    pub dataset_version: Option<String>,
    pub record_count: Option<i64>,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, current) = match db::get_current_version(&state.pool).await {
        Ok(current) => (StatusCode::OK, current),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the dataset version");
            (StatusCode::SERVICE_UNAVAILABLE, None)
        }
    };

    let body = HealthResponse {
        status: if status.is_success() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        record_count: current.as_ref().map(|v| v.record_count),
        dataset_version: current.map(|v| v.version),
    };
    (status, Json(body))
}

async fn root() -> &'static str {
    "Faultsync Server"
}
