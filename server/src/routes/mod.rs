//! HTTP route definitions.

mod health;
mod sync;
mod versions;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(sync::routes())
        .merge(versions::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use crate::config::Config;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// App whose database is unreachable; nothing connects until a query runs.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy("postgres://faultsync@127.0.0.1:9/faultsync")
            .unwrap();
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://faultsync@127.0.0.1:9/faultsync".to_string()),
            _ => None,
        })
        .unwrap();
        create_routes().with_state(AppState {
            pool,
            config: Arc::new(config),
        })
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_unreadable_dataset() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["datasetVersion"], serde_json::Value::Null);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn root_names_the_server() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Faultsync Server");
    }

    #[tokio::test]
    async fn fetch_failure_uses_fetch_shape() {
        let request = Request::post("/sync")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"fromVersion":"1.2.0","toVersion":"1.3.0"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to download updates");
    }

    #[tokio::test]
    async fn check_failure_is_json_error() {
        let response = app()
            .oneshot(Request::get("/sync?version=1.2.0").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Database error");
    }

    #[tokio::test]
    async fn malformed_fetch_body_is_rejected() {
        let request = Request::post("/sync")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn empty_publish_is_rejected_before_database() {
        let request = Request::post("/versions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"version":"1.3.0"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "No changes to publish");
    }
}
