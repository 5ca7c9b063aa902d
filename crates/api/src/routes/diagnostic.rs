//! Route definitions for the diagnostics probes.

use axum::routing::get;
use axum::Router;

use crate::handlers::diagnostic;
use crate::state::AppState;

/// Diagnostics routes.
pub fn diagnostic_router() -> Router<AppState> {
    Router::new()
        .route("/diagnostic", get(diagnostic::run_diagnostic))
        .route("/raw/vehicles", get(diagnostic::raw_vehicles))
        .route("/raw/parts", get(diagnostic::raw_parts))
}
