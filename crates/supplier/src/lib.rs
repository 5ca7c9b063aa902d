//! HTTP client for the upstream inventory provider.
//!
//! The salvage-yard management system exposes change feeds for dismantled
//! vehicles and their parts. Pagination is cursor-based: each page carries a
//! `result_set` with the last record id, which the next request sends back
//! in the `lastid` header. Authentication and paging all travel as request
//! headers, matching the provider's protocol.

pub mod client;
pub mod types;

pub use client::{SupplierClient, SupplierConfig, SupplierError};
pub use types::{PartPage, RawPart, RawVehicle, ResultSet, VehiclePage};
