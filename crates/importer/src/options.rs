//! Start options and the checkpoint blob stored in `import_runs.details`.

use chrono::NaiveDate;
use partsync_core::import::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};

/// Options accepted by the start endpoint and carried in the run row so a
/// paused or failed run can resume with the same settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    /// Cutoff date for incremental imports. Ignored for complete imports.
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    /// Complete resynchronization instead of a windowed one.
    #[serde(default)]
    pub full_import: bool,
    /// Supplier page size.
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    /// Keep going on batch failures, retrying rows individually.
    #[serde(default = "default_true")]
    pub auto_recovery: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            from_date: None,
            full_import: false,
            batch_size: DEFAULT_BATCH_SIZE,
            auto_recovery: true,
        }
    }
}

fn default_batch_size() -> i32 {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

/// What lives in `import_runs.details`: the original options plus the
/// pagination checkpoint the resume path continues from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    #[serde(default)]
    pub options: Option<StartOptions>,
    /// Last feed cursor that was fully persisted.
    #[serde(default)]
    pub last_id: i64,
    /// For sequential (`all`) runs: the phase the checkpoint belongs to.
    #[serde(default)]
    pub phase: Option<String>,
}

impl RunDetails {
    pub fn new(options: StartOptions) -> Self {
        Self {
            options: Some(options),
            last_id: 0,
            phase: None,
        }
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
