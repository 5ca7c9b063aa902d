use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use partsync_api::config::ServerConfig;
use partsync_api::router::build_app_router;
use partsync_api::state::AppState;
use partsync_importer::ImportRunner;
use partsync_supplier::{SupplierClient, SupplierConfig};

/// Build a test `ServerConfig` with safe defaults.
///
/// The supplier points at a closed local port so any accidental feed call
/// fails fast instead of hanging.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        admin_token: None,
        supplier: SupplierConfig {
            base_url: "http://127.0.0.1:9/almacen".to_string(),
            api_key: "test-key".to_string(),
            company_id: 1,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_config(pool, test_config())
}

pub fn build_test_app_with_config(pool: PgPool, config: ServerConfig) -> Router {
    let bus = Arc::new(partsync_events::EventBus::default());
    let supplier = Arc::new(SupplierClient::new(config.supplier.clone()));
    let runner = ImportRunner::new(pool.clone(), supplier, Arc::clone(&bus));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        runner,
        bus,
        scheduler_cancel: tokio_util::sync::CancellationToken::new(),
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Insert a bare run row in the given status, returning its id.
pub async fn insert_run(pool: &PgPool, kind: &str, status: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO import_runs (kind, status) VALUES ($1, $2) RETURNING id",
    )
    .bind(kind)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Insert a finished run with counters, for stats assertions.
pub async fn insert_finished_run(
    pool: &PgPool,
    kind: &str,
    status: &str,
    total: i32,
    new: i32,
    updated: i32,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO import_runs
             (kind, status, total_items, processed_items, new_items, updated_items, ended_at)
         VALUES ($1, $2, $3, $3, $4, $5, now())
         RETURNING id",
    )
    .bind(kind)
    .bind(status)
    .bind(total)
    .bind(new)
    .bind(updated)
    .fetch_one(pool)
    .await
    .unwrap()
}
