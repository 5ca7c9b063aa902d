pub mod diagnostic;
pub mod health;
pub mod import;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /import/start                    trigger an import (POST)
/// /import/history                  run history (GET), clear all (DELETE)
/// /import/runs/{id}                delete one run (DELETE)
/// /import/runs/{id}/pause          pause (POST)
/// /import/runs/{id}/resume         resume (POST)
/// /import/runs/{id}/cancel         cancel (POST)
/// /import/stats                    aggregate stats (GET), reset (DELETE)
/// /import/recount                  recompute vehicle part counters (POST)
/// /import/schedules                list, create (GET, POST)
/// /import/schedules/{id}           update, delete (PUT, DELETE)
/// /import/events                   SSE stream of lifecycle events
///
/// /diagnostic                      system snapshot (GET)
/// /raw/vehicles                    latest vehicle rows probe (GET)
/// /raw/parts                       latest part rows probe (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(import::import_router())
        .merge(diagnostic::diagnostic_router())
}
