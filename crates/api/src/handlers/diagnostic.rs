//! Handlers for the diagnostics panel probes.
//!
//! All three endpoints are point-in-time snapshots; the console fires them
//! concurrently and reduces the statuses to booleans.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use partsync_core::types::Timestamp;
use partsync_db::repositories::CatalogRepo;

use crate::error::AppResult;
use crate::middleware::auth::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Number of rows the raw probes return.
const RAW_SAMPLE_LIMIT: i64 = 10;

/// Snapshot returned by the diagnostic endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResponse {
    pub status: &'static str,
    pub db_healthy: bool,
    pub scheduler_running: bool,
    pub vehicle_rows: i64,
    pub part_rows: i64,
    pub checked_at: Timestamp,
}

/// GET /diagnostic
pub async fn run_diagnostic(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let db_healthy = partsync_db::health_check(&state.pool).await.is_ok();
    let scheduler_running = !state.scheduler_cancel.is_cancelled();

    let (vehicle_rows, part_rows) = if db_healthy {
        (
            CatalogRepo::vehicle_count(&state.pool).await.unwrap_or(0),
            CatalogRepo::part_count(&state.pool).await.unwrap_or(0),
        )
    } else {
        (0, 0)
    };

    let snapshot = DiagnosticResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        db_healthy,
        scheduler_running,
        vehicle_rows,
        part_rows,
        checked_at: Utc::now(),
    };

    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /raw/vehicles
///
/// Most recently synced vehicle rows; a 200 here means the database path
/// through the vehicles table works.
pub async fn raw_vehicles(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows = CatalogRepo::latest_vehicles(&state.pool, RAW_SAMPLE_LIMIT).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /raw/parts
pub async fn raw_parts(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows = CatalogRepo::latest_parts(&state.pool, RAW_SAMPLE_LIMIT).await?;
    Ok(Json(DataResponse { data: rows }))
}
