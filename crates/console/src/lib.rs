//! Headless admin control surface for the import service.
//!
//! This crate is the state layer a back-office frontend binds to: the
//! trigger panel with its per-operation busy store, the schedule manager
//! with draft editing, the live monitor fed by centralized polling, and the
//! diagnostics panel. Every HTTP call goes through one [`ApiClient`]; every
//! user-visible outcome lands in the notification log.

pub mod client;
pub mod console;
pub mod monitor;
pub mod notify;
pub mod ops;
pub mod poller;
pub mod schedules;

pub use client::{ApiClient, ClientError};
pub use console::{Console, View};
pub use notify::{Notification, Severity};
pub use ops::{OpStore, TriggerRefused};
pub use poller::{Poller, PollerIntervals};
