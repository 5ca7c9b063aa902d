//! partsync event bus.
//!
//! Building blocks for the import lifecycle event stream:
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SyncEvent`] -- the canonical event envelope. The API's SSE endpoint
//!   forwards these to subscribed admin clients.

pub mod bus;

pub use bus::{EventBus, SyncEvent};
