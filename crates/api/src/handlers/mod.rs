pub mod diagnostic;
pub mod events;
pub mod import;
pub mod schedule;
pub mod stats;
