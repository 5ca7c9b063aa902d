use std::sync::Arc;

use partsync_events::EventBus;
use partsync_importer::ImportRunner;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: partsync_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The import engine; handlers trigger and resume runs through it.
    pub runner: ImportRunner,
    /// Centralized event bus feeding the SSE endpoint.
    pub bus: Arc<EventBus>,
    /// Token that stops the schedule runner; also doubles as the
    /// "scheduler alive" signal for the diagnostic endpoint.
    pub scheduler_cancel: CancellationToken,
}
