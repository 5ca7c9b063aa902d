//! Handlers for import triggers, history, and per-run control.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use partsync_core::error::CoreError;
use partsync_core::import::{ControlAction, ImportKind, RunStatus, BATCH_SIZES};
use partsync_core::search::{clamp_limit, clamp_offset, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use partsync_core::types::DbId;
use partsync_db::models::import_run::ImportRun;
use partsync_db::repositories::ImportRunRepo;
use partsync_events::SyncEvent;
use partsync_importer::StartOptions;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for starting an import.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportRequest {
    /// `vehicles`, `parts`, or `all`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub full_import: bool,
    #[serde(default)]
    pub batch_size: Option<i32>,
    #[serde(default)]
    pub auto_recovery: Option<bool>,
}

/// Response body for a started import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportResponse {
    pub run_id: DbId,
}

/// Query parameters for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A history row enriched with the control capabilities the console renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub run: ImportRun,
    pub duration_mins: Option<i64>,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_cancel: bool,
}

impl From<ImportRun> for HistoryEntry {
    fn from(run: ImportRun) -> Self {
        let status = run.run_status();
        let duration_mins = run.duration_mins();
        Self {
            duration_mins,
            can_pause: status.is_some_and(|s| s.can_pause()),
            // Broader than the resume endpoint accepts: failed and partial
            // runs are also offered, and the endpoint answers 409 for them.
            can_resume: status.is_some_and(|s| s.can_resume()),
            can_cancel: status.is_some_and(|s| s.can_cancel()),
            run,
        }
    }
}

/// Response body for the clear-all endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryResponse {
    pub deleted_count: i64,
}

/// Response body for the counter recount maintenance action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecountResponse {
    pub updated: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that an import run exists, returning the full row.
async fn ensure_run_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<ImportRun> {
    ImportRunRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ImportRun",
                id,
            })
        })
}

/// Typed status of a run row; unknown tokens mean a skipped migration.
fn run_status(run: &ImportRun) -> AppResult<RunStatus> {
    run.run_status().ok_or_else(|| {
        AppError::InternalError(format!("run {} has unknown status '{}'", run.id, run.status))
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /import/start
///
/// Create a run and start the engine in the background. Returns 202 with the
/// run id; progress is observable via the history endpoint and SSE.
pub async fn start_import(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Json(input): Json<StartImportRequest>,
) -> AppResult<impl IntoResponse> {
    let kind = ImportKind::parse(&input.kind).ok_or_else(|| {
        AppError::BadRequest(format!("unknown import type '{}'", input.kind))
    })?;

    let batch_size = input.batch_size.unwrap_or(partsync_core::import::DEFAULT_BATCH_SIZE);
    if !BATCH_SIZES.contains(&batch_size) {
        return Err(AppError::BadRequest(format!(
            "batch size {batch_size} not allowed (use one of {BATCH_SIZES:?})"
        )));
    }

    let options = StartOptions {
        from_date: input.from_date,
        full_import: input.full_import,
        batch_size,
        auto_recovery: input.auto_recovery.unwrap_or(true),
    };

    let run_id = state.runner.start(kind, options).await?;

    tracing::info!(run_id, kind = %kind, full_import = input.full_import, "Import triggered");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: StartImportResponse { run_id },
        }),
    ))
}

/// GET /import/history?limit=&offset=
///
/// List runs newest-first, each with its control capability flags.
pub async fn list_history(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
    let offset = clamp_offset(params.offset);

    let runs = ImportRunRepo::list(&state.pool, Some(limit), Some(offset)).await?;
    let entries: Vec<HistoryEntry> = runs.into_iter().map(HistoryEntry::from).collect();

    Ok(Json(DataResponse { data: entries }))
}

/// POST /import/runs/{id}/pause
pub async fn pause_run(
    auth: AdminAuth,
    state: State<AppState>,
    id: Path<DbId>,
) -> AppResult<impl IntoResponse> {
    control_run(auth, state, id, ControlAction::Pause).await
}

/// POST /import/runs/{id}/resume
pub async fn resume_run(
    auth: AdminAuth,
    state: State<AppState>,
    id: Path<DbId>,
) -> AppResult<impl IntoResponse> {
    control_run(auth, state, id, ControlAction::Resume).await
}

/// POST /import/runs/{id}/cancel
pub async fn cancel_run(
    auth: AdminAuth,
    state: State<AppState>,
    id: Path<DbId>,
) -> AppResult<impl IntoResponse> {
    control_run(auth, state, id, ControlAction::Cancel).await
}

/// Shared control flow: validate the transition, flip the status row, and
/// (for resume) hand the run back to the engine.
async fn control_run(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    action: ControlAction,
) -> AppResult<impl IntoResponse> {
    let run = ensure_run_exists(&state.pool, id).await?;
    let current = run_status(&run)?;

    let target = action
        .validate(current)
        .map_err(|msg| AppError::Core(CoreError::Conflict(msg)))?;

    let item = match action {
        ControlAction::Pause => "Import paused by the operator",
        ControlAction::Resume => "Resuming import",
        ControlAction::Cancel => "Import cancelled by the operator",
    };

    let updated = ImportRunRepo::set_status(&state.pool, id, target, item)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ImportRun",
                id,
            })
        })?;

    if action == ControlAction::Resume {
        state.runner.spawn_resume(updated.clone());
    }

    tracing::info!(run_id = id, action = action.as_str(), "Import run control applied");
    state.bus.publish(
        SyncEvent::new("run.control").with_run(id).with_payload(
            serde_json::json!({ "action": action.as_str(), "status": target.as_str() }),
        ),
    );

    Ok(Json(DataResponse {
        data: HistoryEntry::from(updated),
    }))
}

/// DELETE /import/runs/{id}
///
/// Remove one history row. Active runs must be cancelled first.
pub async fn delete_run(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let run = ensure_run_exists(&state.pool, id).await?;
    let status = run_status(&run)?;

    if !status.can_delete() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "cannot delete an import run in status '{status}'; cancel it first"
        ))));
    }

    ImportRunRepo::delete(&state.pool, id).await?;
    tracing::info!(run_id = id, "Import run deleted from history");

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /import/history
///
/// Clear the whole history. Refused while any run is active.
pub async fn clear_history(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let active = ImportRunRepo::count_active(&state.pool).await?;
    if active > 0 {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "cannot clear history while {active} import(s) are active; cancel them first"
        ))));
    }

    let deleted_count = ImportRunRepo::delete_all(&state.pool).await?;
    tracing::info!(deleted_count, "Import history cleared");

    Ok(Json(DataResponse {
        data: ClearHistoryResponse { deleted_count },
    }))
}

/// POST /import/recount
///
/// Recompute per-vehicle part counters.
pub async fn recount_counters(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let updated = state.runner.recount().await?;
    Ok(Json(DataResponse {
        data: RecountResponse { updated },
    }))
}
