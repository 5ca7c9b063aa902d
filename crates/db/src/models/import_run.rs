//! Import run model.

use partsync_core::import::RunStatus;
use partsync_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `import_runs` table.
///
/// Serialized camelCase: the admin console speaks the same wire format as
/// the rest of the storefront APIs.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportRun {
    pub id: DbId,
    pub kind: String,
    pub status: String,
    pub is_full_import: bool,
    pub progress: i32,
    pub processing_item: String,
    pub total_items: i32,
    pub processed_items: i32,
    pub new_items: i32,
    pub updated_items: i32,
    pub deactivated_items: i32,
    pub error_count: i32,
    pub errors: String,
    pub details: serde_json::Value,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub last_updated: Timestamp,
}

impl ImportRun {
    /// Typed view of the status column. `None` only if the row holds a token
    /// this build does not know, which would indicate a skipped migration.
    pub fn run_status(&self) -> Option<RunStatus> {
        RunStatus::parse(&self.status)
    }

    /// Wall-clock duration in whole minutes, when the run has ended.
    pub fn duration_mins(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_minutes())
    }
}

/// DTO for creating a new import run.
#[derive(Debug, Deserialize)]
pub struct CreateImportRun {
    pub kind: String,
    pub is_full_import: bool,
    pub processing_item: String,
    /// Original start options plus checkpoint data, carried for resume.
    pub details: serde_json::Value,
}

/// Incremental progress update written while a run is executing.
#[derive(Debug)]
pub struct RunProgress {
    pub progress: i32,
    pub processing_item: String,
    pub total_items: i32,
    pub processed_items: i32,
    pub new_items: i32,
    pub updated_items: i32,
    pub details: serde_json::Value,
}

/// Final counters written when a run reaches a terminal state.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub total_items: i32,
    pub processed_items: i32,
    pub new_items: i32,
    pub updated_items: i32,
    pub deactivated_items: i32,
    pub error_count: i32,
    pub errors: String,
}

/// Aggregate counters across all runs, for the stats endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunTotals {
    pub total_runs: i64,
    pub completed_runs: i64,
    pub last_finished: Option<Timestamp>,
}

/// Item totals for one import kind.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindTotals {
    pub total_items: i64,
    pub new_items: i64,
    pub updated_items: i64,
}
