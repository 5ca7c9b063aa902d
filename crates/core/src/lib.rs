//! Pure domain logic for the partsync platform.
//!
//! This crate has zero internal dependencies and performs no I/O. It holds
//! the import-kind/status vocabulary, the run state machine, the schedule
//! frequency and next-run calculations, and the control-surface operation
//! keys shared by the API and the admin console.

pub mod error;
pub mod import;
pub mod ops;
pub mod schedule;
pub mod search;
pub mod stats;
pub mod types;

pub use error::CoreError;
