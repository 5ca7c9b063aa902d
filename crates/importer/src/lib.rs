//! The import engine.
//!
//! [`ImportRunner`] executes import runs against the supplier change feeds:
//! paginated pulls, batch upserts into the catalog, progress and checkpoint
//! persistence, and observation of pause/cancel requests at page boundaries.
//! [`ScheduleRunner`] is the background loop that fires recurring schedules.

pub mod options;
pub mod runner;
pub mod scheduler;

pub use options::StartOptions;
pub use runner::{EngineError, ImportRunner};
pub use scheduler::ScheduleRunner;
