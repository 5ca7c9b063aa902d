//! HTTP client for the import service's admin API.
//!
//! Error policy follows the panel's needs: every failure collapses into a
//! [`ClientError`] whose message is the server's `error` field when the body
//! decodes, or a static fallback when it does not. Callers turn that into a
//! notification; nothing is retried here.

use chrono::NaiveDate;
use partsync_core::import::{ControlAction, ImportKind, ImportMode};
use partsync_core::types::{DbId, Timestamp};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Request timeout for console calls; the panel never waits on an import,
/// only on the trigger round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed console call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Human-readable text for a notification.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The `{ "data": ... }` envelope every endpoint responds with.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// One run row from the history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: DbId,
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub processing_item: String,
    #[serde(default)]
    pub total_items: i32,
    #[serde(default)]
    pub processed_items: i32,
    #[serde(default)]
    pub new_items: i32,
    #[serde(default)]
    pub updated_items: i32,
    #[serde(default)]
    pub error_count: i32,
    #[serde(default)]
    pub can_pause: bool,
    #[serde(default)]
    pub can_resume: bool,
    #[serde(default)]
    pub can_cancel: bool,
}

/// A schedule record as the server returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: DbId,
    pub kind: String,
    pub frequency: String,
    pub active: bool,
    pub is_full_import: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub last_run: Option<Timestamp>,
    #[serde(default)]
    pub next_run: Option<Timestamp>,
}

/// Per-kind item totals inside the stats payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindStats {
    #[serde(default)]
    pub total_items: i64,
    #[serde(default)]
    pub new_items: i64,
    #[serde(default)]
    pub updated_items: i64,
}

/// Aggregate statistics for the stats panel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_imports: i64,
    #[serde(default)]
    pub successful_imports: i64,
    #[serde(default)]
    pub success_rate: i64,
    #[serde(default)]
    pub last_import: Option<Timestamp>,
    #[serde(default)]
    pub next_scheduled: Option<Timestamp>,
    #[serde(default)]
    pub vehicles: KindStats,
    #[serde(default)]
    pub parts: KindStats,
}

/// Snapshot from the diagnostic endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub db_healthy: bool,
    #[serde(default)]
    pub scheduler_running: bool,
}

/// Settings the trigger panel sends with every start request.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub from_date: Option<NaiveDate>,
    pub batch_size: i32,
    pub auto_recovery: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            from_date: None,
            batch_size: partsync_core::import::DEFAULT_BATCH_SIZE,
            auto_recovery: true,
        }
    }
}

/// Fields for creating a schedule.
#[derive(Debug, Clone)]
pub struct ScheduleDraft {
    pub kind: ImportKind,
    pub frequency: String,
    pub active: bool,
    pub is_full_import: bool,
    pub start_time: Option<String>,
    pub days: Vec<String>,
}

impl Default for ScheduleDraft {
    /// The panel's initial form state: incremental vehicle sync every 12
    /// hours on weekdays.
    fn default() -> Self {
        Self {
            kind: ImportKind::Vehicles,
            frequency: "12h".to_string(),
            active: true,
            is_full_import: false,
            start_time: Some("02:00".to_string()),
            days: ["monday", "tuesday", "wednesday", "thursday", "friday"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Partial schedule update; `None` fields are left untouched server-side.
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub frequency: Option<String>,
    pub active: Option<bool>,
    pub is_full_import: Option<bool>,
    pub start_time: Option<String>,
    pub days: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Thin typed wrapper over the admin API.
pub struct ApiClient {
    base_url: String,
    admin_token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, admin_token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_token,
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.admin_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // -- import triggers ----------------------------------------------------

    /// Start an import. Returns the new run id.
    pub async fn start_import(
        &self,
        kind: ImportKind,
        mode: ImportMode,
        config: &ImportConfig,
    ) -> Result<DbId, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Started {
            run_id: DbId,
        }

        let body = serde_json::json!({
            "type": kind.as_str(),
            "fullImport": mode.is_full(),
            // Incremental imports may pin an explicit cutoff date.
            "fromDate": (!mode.is_full()).then_some(config.from_date).flatten(),
            "batchSize": config.batch_size,
            "autoRecovery": config.auto_recovery,
        });

        let response = self
            .authorize(self.http.post(self.url("/api/v1/import/start")))
            .json(&body)
            .send()
            .await?;
        let started: Started = decode(response).await?;
        Ok(started.run_id)
    }

    /// Trigger the vehicle part-counter recount.
    pub async fn recount(&self) -> Result<i64, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Recounted {
            updated: i64,
        }

        let response = self
            .authorize(self.http.post(self.url("/api/v1/import/recount")))
            .send()
            .await?;
        let recounted: Recounted = decode(response).await?;
        Ok(recounted.updated)
    }

    // -- history / monitor ---------------------------------------------------

    pub async fn history(&self, limit: i64) -> Result<Vec<RunSummary>, ClientError> {
        let response = self
            .authorize(
                self.http
                    .get(self.url(&format!("/api/v1/import/history?limit={limit}"))),
            )
            .send()
            .await?;
        decode(response).await
    }

    pub async fn control_run(&self, id: DbId, action: ControlAction) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.post(self.url(&format!(
                "/api/v1/import/runs/{id}/{}",
                action.as_str()
            ))))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn delete_run(&self, id: DbId) -> Result<(), ClientError> {
        let response = self
            .authorize(
                self.http
                    .delete(self.url(&format!("/api/v1/import/runs/{id}"))),
            )
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn clear_history(&self) -> Result<i64, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Cleared {
            deleted_count: i64,
        }

        let response = self
            .authorize(self.http.delete(self.url("/api/v1/import/history")))
            .send()
            .await?;
        let cleared: Cleared = decode(response).await?;
        Ok(cleared.deleted_count)
    }

    // -- stats ---------------------------------------------------------------

    pub async fn stats(&self) -> Result<Stats, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/v1/import/stats")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn clear_stats(&self) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.delete(self.url("/api/v1/import/stats")))
            .send()
            .await?;
        expect_success(response).await
    }

    // -- schedules -----------------------------------------------------------

    pub async fn schedules(&self) -> Result<Vec<ScheduleRecord>, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/v1/import/schedules")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_schedule(
        &self,
        draft: &ScheduleDraft,
    ) -> Result<ScheduleRecord, ClientError> {
        let body = serde_json::json!({
            "type": draft.kind.as_str(),
            "frequency": draft.frequency,
            "active": draft.active,
            "isFullImport": draft.is_full_import,
            "startTime": draft.start_time,
            "days": draft.days,
        });
        let response = self
            .authorize(self.http.post(self.url("/api/v1/import/schedules")))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_schedule(
        &self,
        id: DbId,
        patch: &SchedulePatch,
    ) -> Result<ScheduleRecord, ClientError> {
        let body = serde_json::json!({
            "frequency": patch.frequency,
            "active": patch.active,
            "isFullImport": patch.is_full_import,
            "startTime": patch.start_time,
            "days": patch.days,
        });
        let response = self
            .authorize(
                self.http
                    .put(self.url(&format!("/api/v1/import/schedules/{id}"))),
            )
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_schedule(&self, id: DbId) -> Result<(), ClientError> {
        let response = self
            .authorize(
                self.http
                    .delete(self.url(&format!("/api/v1/import/schedules/{id}"))),
            )
            .send()
            .await?;
        expect_success(response).await
    }

    // -- diagnostics ---------------------------------------------------------

    /// The diagnostic snapshot endpoint; errors mean the API is unreachable.
    pub async fn diagnostic(&self) -> Result<DiagnosticSnapshot, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/v1/diagnostic")))
            .send()
            .await?;
        decode(response).await
    }

    /// True when a raw-table probe answers 2xx. Transport errors are false;
    /// the diagnostics panel reduces these to booleans either way.
    pub async fn probe_raw(&self, table: &str) -> bool {
        let result = self
            .authorize(self.http.get(self.url(&format!("/api/v1/raw/{table}"))))
            .send()
            .await;
        matches!(result, Ok(response) if response.status().is_success())
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Unwrap a `{ "data": T }` success envelope or produce a [`ClientError`].
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status, response).await);
    }
    let envelope: DataEnvelope<T> = response.json().await?;
    Ok(envelope.data)
}

/// Success check for endpoints whose body the console ignores.
async fn expect_success(response: reqwest::Response) -> Result<(), ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status, response).await);
    }
    Ok(())
}

/// Build the error the panels show: the server's message when the body
/// decodes, a static fallback otherwise.
async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| format!("request failed with status {status}"));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
