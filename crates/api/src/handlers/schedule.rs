//! Handlers for recurring-import schedule CRUD.
//!
//! Token validation happens here, before anything reaches the repository:
//! kind and frequency must be known tokens, the start time must be a valid
//! `HH:MM`, and day tokens must be real weekdays. Creating a second schedule
//! for the same kind is a conflict (update the existing one instead).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use partsync_core::error::CoreError;
use partsync_core::import::ImportKind;
use partsync_core::schedule::{Frequency, StartTime, Weekday};
use partsync_core::types::DbId;
use partsync_db::models::import_schedule::{
    CreateImportSchedule, ImportSchedule, UpdateImportSchedule,
};
use partsync_db::repositories::ImportScheduleRepo;
use partsync_importer::scheduler::compute_next_run;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for creating a schedule.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub frequency: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_full_import: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub days: Vec<String>,
}

/// Request body for a partial schedule update. Absent fields keep their
/// current value; toggling active is just `{"active": false}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub frequency: Option<String>,
    pub active: Option<bool>,
    pub is_full_import: Option<bool>,
    pub start_time: Option<String>,
    pub days: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_frequency(token: &str) -> AppResult<()> {
    Frequency::parse(token)
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest(format!("unknown frequency '{token}'")))
}

fn validate_start_time(raw: &str) -> AppResult<()> {
    StartTime::parse(raw)
        .map(|_| ())
        .map_err(AppError::BadRequest)
}

fn validate_days(days: &[String]) -> AppResult<()> {
    for day in days {
        if Weekday::parse(day).is_none() {
            return Err(AppError::BadRequest(format!("unknown weekday '{day}'")));
        }
    }
    Ok(())
}

async fn ensure_schedule_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<ImportSchedule> {
    ImportScheduleRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ImportSchedule",
                id,
            })
        })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /import/schedules
pub async fn list_schedules(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let schedules = ImportScheduleRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: schedules }))
}

/// POST /import/schedules
pub async fn create_schedule(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateScheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let kind = ImportKind::parse(&input.kind).ok_or_else(|| {
        AppError::BadRequest(format!("unknown import type '{}'", input.kind))
    })?;
    validate_frequency(&input.frequency)?;
    if let Some(ref raw) = input.start_time {
        validate_start_time(raw)?;
    }
    validate_days(&input.days)?;

    if ImportScheduleRepo::find_by_kind(&state.pool, kind.as_str())
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "a schedule for '{kind}' already exists; update it instead of creating a new one"
        ))));
    }

    let mut create = CreateImportSchedule {
        kind: kind.as_str().to_string(),
        frequency: input.frequency,
        active: input.active,
        is_full_import: input.is_full_import,
        start_time: input.start_time,
        days: input.days,
        next_run: None,
    };

    // Seed next_run from a throwaway row view so creation and the schedule
    // runner share one calculation.
    let preview = ImportSchedule {
        id: 0,
        kind: create.kind.clone(),
        frequency: create.frequency.clone(),
        active: create.active,
        is_full_import: create.is_full_import,
        start_time: create.start_time.clone(),
        days: create.days.clone(),
        last_run: None,
        next_run: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    create.next_run = Some(compute_next_run(&preview, Utc::now()));

    let schedule = ImportScheduleRepo::create(&state.pool, &create).await?;

    tracing::info!(
        schedule_id = schedule.id,
        kind = %schedule.kind,
        frequency = %schedule.frequency,
        "Import schedule created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: schedule })))
}

/// PUT /import/schedules/{id}
///
/// Partial update; recomputes `next_run` when the frequency or start time
/// change.
pub async fn update_schedule(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateScheduleRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref frequency) = input.frequency {
        validate_frequency(frequency)?;
    }
    if let Some(ref raw) = input.start_time {
        validate_start_time(raw)?;
    }
    if let Some(ref days) = input.days {
        validate_days(days)?;
    }

    let existing = ensure_schedule_exists(&state.pool, id).await?;

    // Recompute the fire time against the post-update values.
    let next_run = if input.frequency.is_some() || input.start_time.is_some() {
        let merged = ImportSchedule {
            frequency: input
                .frequency
                .clone()
                .unwrap_or_else(|| existing.frequency.clone()),
            start_time: input.start_time.clone().or_else(|| existing.start_time.clone()),
            days: input.days.clone().unwrap_or_else(|| existing.days.clone()),
            ..existing.clone()
        };
        Some(compute_next_run(&merged, Utc::now()))
    } else {
        None
    };

    let update = UpdateImportSchedule {
        frequency: input.frequency,
        active: input.active,
        is_full_import: input.is_full_import,
        start_time: input.start_time,
        days: input.days,
        next_run,
    };

    let updated = ImportScheduleRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ImportSchedule",
                id,
            })
        })?;

    tracing::info!(
        schedule_id = id,
        active = updated.active,
        frequency = %updated.frequency,
        "Import schedule updated"
    );

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /import/schedules/{id}
pub async fn delete_schedule(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_schedule_exists(&state.pool, id).await?;
    ImportScheduleRepo::delete(&state.pool, id).await?;

    tracing::info!(schedule_id = id, "Import schedule deleted");

    Ok(StatusCode::NO_CONTENT)
}
