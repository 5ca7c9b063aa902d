//! Handlers for the aggregate import statistics panel.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use partsync_core::stats::success_rate;
use partsync_core::types::Timestamp;
use partsync_db::models::import_run::KindTotals;
use partsync_db::repositories::{ImportRunRepo, ImportScheduleRepo};

use crate::error::AppResult;
use crate::middleware::auth::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Aggregate statistics for the stats panel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_imports: i64,
    pub successful_imports: i64,
    /// Whole percentage, 0 when there are no runs.
    pub success_rate: i64,
    pub last_import: Option<Timestamp>,
    pub next_scheduled: Option<Timestamp>,
    pub vehicles: KindTotals,
    pub parts: KindTotals,
}

/// Response body for the counter reset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetStatsResponse {
    pub reset_rows: i64,
}

/// GET /import/stats
pub async fn get_stats(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let totals = ImportRunRepo::totals(&state.pool).await?;
    let vehicles = ImportRunRepo::kind_totals(&state.pool, "vehicles").await?;
    let parts = ImportRunRepo::kind_totals(&state.pool, "parts").await?;
    let next_scheduled = ImportScheduleRepo::next_scheduled(&state.pool).await?;

    let stats = StatsResponse {
        total_imports: totals.total_runs,
        successful_imports: totals.completed_runs,
        success_rate: success_rate(totals.total_runs, totals.completed_runs),
        last_import: totals.last_finished,
        next_scheduled,
        vehicles,
        parts,
    };

    Ok(Json(DataResponse { data: stats }))
}

/// DELETE /import/stats
///
/// Zero the counter columns on every history row without deleting anything.
pub async fn reset_stats(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let reset_rows = ImportRunRepo::reset_counters(&state.pool).await?;
    tracing::info!(reset_rows, "Import statistics reset");

    Ok(Json(DataResponse {
        data: ResetStatsResponse { reset_rows },
    }))
}
