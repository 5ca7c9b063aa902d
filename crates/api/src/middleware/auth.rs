//! Admin token authentication.
//!
//! The back office is single-tenant: one static bearer token, configured via
//! `ADMIN_TOKEN`, guards every `/api/v1` route. When no token is configured
//! the check is disabled so local development works out of the box.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that rejects requests without a valid admin token.
///
/// Handlers take this as their first argument, mirroring how authenticated
/// routes are marked elsewhere in the codebase.
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(AdminAuth);
        };

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(token) if token == expected => Ok(AdminAuth),
            Some(_) => Err(AppError::Unauthorized("invalid admin token".to_string())),
            None => Err(AppError::Unauthorized(
                "missing bearer token".to_string(),
            )),
        }
    }
}
