//! Domain-level error type shared across the workspace.

use crate::types::DbId;

/// A domain error, independent of any transport.
///
/// The API crate maps these onto HTTP statuses; the importer and console
/// crates propagate them as-is.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup came back empty.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed a domain validation rule.
    #[error("{0}")]
    Validation(String),

    /// The request conflicts with current state (bad transition, duplicate).
    #[error("{0}")]
    Conflict(String),

    /// Something went wrong that the caller cannot fix.
    #[error("{0}")]
    Internal(String),
}
