//! Catalog row models: dismantled vehicles and their parts.

use partsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `vehicles` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: DbId,
    pub supplier_ref: i64,
    pub make: String,
    pub model: String,
    pub trim_level: String,
    pub year: i32,
    pub fuel: String,
    pub part_count: i32,
    pub active: bool,
    pub synced_at: Timestamp,
}

/// A row from the `parts` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: DbId,
    pub supplier_ref: i64,
    pub vehicle_ref: i64,
    pub vehicle_id: Option<DbId>,
    pub family: String,
    pub description: String,
    pub price_cents: i64,
    pub active: bool,
    pub synced_at: Timestamp,
}

/// Normalized vehicle data ready for a batch upsert.
#[derive(Debug, Clone)]
pub struct UpsertVehicle {
    pub supplier_ref: i64,
    pub make: String,
    pub model: String,
    pub trim_level: String,
    pub year: i32,
    pub fuel: String,
}

/// Normalized part data ready for a batch upsert.
#[derive(Debug, Clone)]
pub struct UpsertPart {
    pub supplier_ref: i64,
    pub vehicle_ref: i64,
    pub family: String,
    pub description: String,
    pub price_cents: i64,
    /// Parts with no sellable price arrive deactivated.
    pub active: bool,
}

/// Outcome of one batch upsert.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOutcome {
    pub inserted: i64,
    pub updated: i64,
}
