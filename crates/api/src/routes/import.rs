//! Route definitions for the import control surface.
//!
//! Mounted under `/api/v1` by `api_routes()`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{events, import, schedule, stats};
use crate::state::AppState;

/// Import routes.
pub fn import_router() -> Router<AppState> {
    Router::new()
        .route("/import/start", post(import::start_import))
        .route(
            "/import/history",
            get(import::list_history).delete(import::clear_history),
        )
        .route("/import/runs/{id}", delete(import::delete_run))
        .route("/import/runs/{id}/pause", post(import::pause_run))
        .route("/import/runs/{id}/resume", post(import::resume_run))
        .route("/import/runs/{id}/cancel", post(import::cancel_run))
        .route(
            "/import/stats",
            get(stats::get_stats).delete(stats::reset_stats),
        )
        .route("/import/recount", post(import::recount_counters))
        .route(
            "/import/schedules",
            get(schedule::list_schedules).post(schedule::create_schedule),
        )
        .route(
            "/import/schedules/{id}",
            axum::routing::put(schedule::update_schedule).delete(schedule::delete_schedule),
        )
        .route("/import/events", get(events::event_stream))
}
