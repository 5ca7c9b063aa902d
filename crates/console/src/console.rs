//! The admin console: panels, notifications, and the active view.
//!
//! All methods take `&self`; panel state lives behind short-lived mutexes
//! that are never held across an await. The busy store is claimed before
//! any request is issued and released when the request settles, so the
//! trigger guarantees hold even when calls overlap.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use partsync_core::import::{ControlAction, ImportKind, ImportMode};
use partsync_core::ops::OpKey;
use partsync_core::types::{DbId, Timestamp};

use crate::client::{
    ApiClient, ClientError, ImportConfig, RunSummary, ScheduleRecord, Stats,
};
use crate::monitor::MonitorState;
use crate::notify::Notification;
use crate::ops::{OpStore, TriggerRefused};
use crate::schedules::ScheduleState;

/// How many history rows the monitor asks for.
const HISTORY_LIMIT: i64 = 20;

/// The console's tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Import,
    Schedule,
    Monitor,
    Config,
}

/// Why a trigger did not start an import.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// The operation or a conflicting sibling is already pending.
    #[error("{0}")]
    Busy(#[from] TriggerRefused),

    /// The server refused or the request failed.
    #[error("{0}")]
    Api(#[from] ClientError),
}

/// Point-in-time snapshot from the diagnostics panel.
#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    pub api_connection: bool,
    pub database_connection: bool,
    pub scheduler_status: bool,
    pub checked_at: Timestamp,
}

/// The control surface.
pub struct Console {
    client: Arc<ApiClient>,
    /// Finite operation-to-pending map backing the trigger buttons.
    pub ops: OpStore,
    view: Mutex<View>,
    notifications: Mutex<Vec<Notification>>,
    import_config: Mutex<ImportConfig>,
    monitor: Mutex<MonitorState>,
    schedules: Mutex<ScheduleState>,
    stats: Mutex<Stats>,
}

impl Console {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client: Arc::new(client),
            ops: OpStore::new(),
            view: Mutex::new(View::Import),
            notifications: Mutex::new(Vec::new()),
            import_config: Mutex::new(ImportConfig::default()),
            monitor: Mutex::new(MonitorState::default()),
            schedules: Mutex::new(ScheduleState::default()),
            stats: Mutex::new(Stats::default()),
        }
    }

    // -----------------------------------------------------------------------
    // View & notifications
    // -----------------------------------------------------------------------

    pub fn view(&self) -> View {
        *self.view.lock().expect("view")
    }

    pub fn set_view(&self, view: View) {
        *self.view.lock().expect("view") = view;
    }

    /// Drain the pending notifications (the frontend shows them as toasts).
    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().expect("notifications"))
    }

    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("notifications")
            .push(notification);
    }

    /// Update the shared import settings form.
    pub fn set_import_config(&self, config: ImportConfig) {
        *self.import_config.lock().expect("import config") = config;
    }

    // -----------------------------------------------------------------------
    // Trigger panel
    // -----------------------------------------------------------------------

    /// Start an import for one of the six kind/mode combinations.
    ///
    /// The busy flag is claimed before the request goes out and released
    /// when it settles; a conflicting pending operation refuses immediately
    /// without touching the network.
    pub async fn trigger_import(
        &self,
        kind: ImportKind,
        mode: ImportMode,
    ) -> Result<DbId, TriggerError> {
        let _guard = self.ops.try_begin(OpKey::Import(kind, mode))?;
        let config = self.import_config.lock().expect("import config").clone();

        match self.client.start_import(kind, mode, &config).await {
            Ok(run_id) => {
                let mode_name = if mode.is_full() { "complete" } else { "incremental" };
                self.notify(Notification::info(
                    "Import started",
                    format!("The {mode_name} {kind} import has begun"),
                ));
                // Jump to the monitor so the new run is immediately visible.
                self.set_view(View::Monitor);
                let _ = self.refresh_history().await;
                let _ = self.refresh_stats().await;
                Ok(run_id)
            }
            Err(e) => {
                self.notify(Notification::error("Import failed", e.message()));
                Err(e.into())
            }
        }
    }

    /// Run the part-counter recount maintenance action.
    pub async fn trigger_recount(&self) -> Result<i64, TriggerError> {
        let _guard = self.ops.try_begin(OpKey::Recount)?;

        match self.client.recount().await {
            Ok(updated) => {
                self.notify(Notification::info(
                    "Counters updated",
                    format!("Part counters recomputed for {updated} vehicles"),
                ));
                let _ = self.refresh_stats().await;
                Ok(updated)
            }
            Err(e) => {
                self.notify(Notification::error("Counter update failed", e.message()));
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Monitor
    // -----------------------------------------------------------------------

    /// Fetch history and re-derive the monitor state. Polling errors keep
    /// the last known-good snapshot.
    pub async fn refresh_history(&self) -> Result<(), ClientError> {
        match self.client.history(HISTORY_LIMIT).await {
            Ok(history) => {
                self.monitor.lock().expect("monitor").apply(history);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "History refresh failed");
                Err(e)
            }
        }
    }

    pub fn auto_refresh_active(&self) -> bool {
        self.monitor.lock().expect("monitor").auto_refresh_active
    }

    pub fn history_snapshot(&self) -> Vec<RunSummary> {
        self.monitor.lock().expect("monitor").history.clone()
    }

    pub fn active_runs(&self) -> Vec<RunSummary> {
        self.monitor.lock().expect("monitor").active_runs.clone()
    }

    /// Pause/resume/cancel one run and refetch history on success.
    pub async fn control_run(
        &self,
        id: DbId,
        action: ControlAction,
    ) -> Result<(), ClientError> {
        match self.client.control_run(id, action).await {
            Ok(()) => {
                let past = match action {
                    ControlAction::Pause => "paused",
                    ControlAction::Resume => "resumed",
                    ControlAction::Cancel => "cancelled",
                };
                self.notify(Notification::info(
                    format!("Import {past}"),
                    format!("The import has been {past}"),
                ));
                let _ = self.refresh_history().await;
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Control action failed", e.message()));
                Err(e)
            }
        }
    }

    /// Remove one run from history.
    pub async fn delete_run(&self, id: DbId) -> Result<(), ClientError> {
        match self.client.delete_run(id).await {
            Ok(()) => {
                self.notify(Notification::info(
                    "Import deleted",
                    "The run has been removed from history",
                ));
                let _ = self.refresh_history().await;
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Delete failed", e.message()));
                Err(e)
            }
        }
    }

    /// Clear the whole history.
    pub async fn clear_history(&self) -> Result<i64, ClientError> {
        match self.client.clear_history().await {
            Ok(deleted) => {
                self.notify(Notification::info(
                    "History cleared",
                    format!("{deleted} run(s) removed"),
                ));
                let _ = self.refresh_history().await;
                let _ = self.refresh_stats().await;
                Ok(deleted)
            }
            Err(e) => {
                self.notify(Notification::error("Clear failed", e.message()));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub async fn refresh_stats(&self) -> Result<(), ClientError> {
        match self.client.stats().await {
            Ok(stats) => {
                *self.stats.lock().expect("stats") = stats;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stats refresh failed");
                Err(e)
            }
        }
    }

    pub fn stats_snapshot(&self) -> Stats {
        self.stats.lock().expect("stats").clone()
    }

    /// Reset the aggregate counters.
    pub async fn clear_stats(&self) -> Result<(), ClientError> {
        match self.client.clear_stats().await {
            Ok(()) => {
                self.notify(Notification::info(
                    "Statistics cleared",
                    "Import statistics have been reset",
                ));
                let _ = self.refresh_stats().await;
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Statistics reset failed", e.message()));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Schedule manager
    // -----------------------------------------------------------------------

    pub async fn refresh_schedules(&self) -> Result<(), ClientError> {
        match self.client.schedules().await {
            Ok(list) => {
                self.schedules.lock().expect("schedules").apply(list);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Schedule refresh failed");
                Err(e)
            }
        }
    }

    pub fn schedules_snapshot(&self) -> Vec<ScheduleRecord> {
        self.schedules.lock().expect("schedules").list.clone()
    }

    /// Access the creation form.
    pub fn with_new_draft<R>(
        &self,
        f: impl FnOnce(&mut crate::client::ScheduleDraft) -> R,
    ) -> R {
        f(&mut self.schedules.lock().expect("schedules").new_draft)
    }

    /// Create a schedule from the creation form; on success the list is
    /// refetched and the form resets.
    pub async fn create_schedule(&self) -> Result<(), ClientError> {
        let draft = self.schedules.lock().expect("schedules").new_draft.clone();

        match self.client.create_schedule(&draft).await {
            Ok(created) => {
                let mode_name = if draft.is_full_import { "complete" } else { "incremental" };
                self.notify(Notification::info(
                    "Schedule created",
                    format!(
                        "{mode_name} {} import scheduled every {}",
                        created.kind, created.frequency
                    ),
                ));
                let _ = self.refresh_schedules().await;
                self.schedules.lock().expect("schedules").reset_new_draft();
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Schedule creation failed", e.message()));
                Err(e)
            }
        }
    }

    /// Copy a schedule into the editing draft.
    pub fn begin_edit(&self, id: DbId) -> bool {
        self.schedules.lock().expect("schedules").begin_edit(id)
    }

    /// Discard the editing draft; no server call happens.
    pub fn cancel_edit(&self) {
        self.schedules.lock().expect("schedules").cancel_edit();
    }

    /// Mutate the editing draft, when one is open.
    pub fn with_editing<R>(
        &self,
        f: impl FnOnce(&mut crate::schedules::EditingSchedule) -> R,
    ) -> Option<R> {
        self.schedules
            .lock()
            .expect("schedules")
            .editing
            .as_mut()
            .map(f)
    }

    /// Push the editing draft to the server. The draft survives a failed
    /// save so the operator can correct and retry.
    pub async fn save_edit(&self) -> Result<(), ClientError> {
        let Some((id, patch)) = self
            .schedules
            .lock()
            .expect("schedules")
            .editing
            .as_ref()
            .map(|e| (e.id, e.as_patch()))
        else {
            return Ok(());
        };

        match self.client.update_schedule(id, &patch).await {
            Ok(_) => {
                self.notify(Notification::info(
                    "Schedule updated",
                    "The schedule has been updated",
                ));
                let _ = self.refresh_schedules().await;
                self.schedules.lock().expect("schedules").cancel_edit();
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Schedule update failed", e.message()));
                Err(e)
            }
        }
    }

    /// Flip a schedule's active switch.
    pub async fn toggle_schedule(&self, id: DbId, active: bool) -> Result<(), ClientError> {
        let patch = crate::client::SchedulePatch {
            active: Some(active),
            ..Default::default()
        };
        match self.client.update_schedule(id, &patch).await {
            Ok(_) => {
                self.notify(Notification::info(
                    if active { "Schedule activated" } else { "Schedule deactivated" },
                    format!(
                        "The schedule has been {}",
                        if active { "activated" } else { "deactivated" }
                    ),
                ));
                let _ = self.refresh_schedules().await;
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Schedule update failed", e.message()));
                Err(e)
            }
        }
    }

    pub async fn delete_schedule(&self, id: DbId) -> Result<(), ClientError> {
        match self.client.delete_schedule(id).await {
            Ok(()) => {
                self.notify(Notification::info(
                    "Schedule deleted",
                    "The schedule has been removed",
                ));
                let _ = self.refresh_schedules().await;
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Schedule deletion failed", e.message()));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Diagnostics panel
    // -----------------------------------------------------------------------

    /// Fire the three probes concurrently and reduce them to booleans.
    /// Point-in-time snapshot; no retry, no backoff.
    pub async fn run_diagnostics(&self) -> DiagnosticsReport {
        let (diagnostic, vehicles_ok, parts_ok) = tokio::join!(
            self.client.diagnostic(),
            self.client.probe_raw("vehicles"),
            self.client.probe_raw("parts"),
        );

        let report = DiagnosticsReport {
            api_connection: diagnostic.is_ok(),
            database_connection: vehicles_ok && parts_ok,
            scheduler_status: diagnostic
                .as_ref()
                .map(|d| d.scheduler_running)
                .unwrap_or(false),
            checked_at: Utc::now(),
        };

        if report.api_connection && report.database_connection {
            self.notify(Notification::info(
                "Diagnostics complete",
                "All systems are working correctly",
            ));
        } else {
            self.notify(Notification::error(
                "Problems detected",
                "Some systems reported failures",
            ));
        }

        report
    }
}
