//! Import schedule model.

use partsync_core::import::ImportKind;
use partsync_core::schedule::Frequency;
use partsync_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `import_schedules` table. Serialized camelCase for the
/// admin console.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportSchedule {
    pub id: DbId,
    pub kind: String,
    pub frequency: String,
    pub active: bool,
    pub is_full_import: bool,
    pub start_time: Option<String>,
    pub days: Vec<String>,
    pub last_run: Option<Timestamp>,
    pub next_run: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportSchedule {
    pub fn import_kind(&self) -> Option<ImportKind> {
        ImportKind::parse(&self.kind)
    }

    pub fn frequency_token(&self) -> Option<Frequency> {
        Frequency::parse(&self.frequency)
    }
}

/// DTO for creating a schedule. Validation happens in the handler; the
/// repository assumes tokens are already checked.
#[derive(Debug, Deserialize)]
pub struct CreateImportSchedule {
    pub kind: String,
    pub frequency: String,
    pub active: bool,
    pub is_full_import: bool,
    pub start_time: Option<String>,
    pub days: Vec<String>,
    pub next_run: Option<Timestamp>,
}

/// Partial update for a schedule. `None` fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateImportSchedule {
    pub frequency: Option<String>,
    pub active: Option<bool>,
    pub is_full_import: Option<bool>,
    pub start_time: Option<String>,
    pub days: Option<Vec<String>>,
    pub next_run: Option<Timestamp>,
}
