//! Repository for the `import_schedules` table.

use partsync_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::import_schedule::{
    CreateImportSchedule, ImportSchedule, UpdateImportSchedule,
};

/// Column list for import_schedules queries.
const COLUMNS: &str = "id, kind, frequency, active, is_full_import, start_time, days, \
    last_run, next_run, created_at, updated_at";

/// Provides CRUD and due-scan operations for import schedules.
pub struct ImportScheduleRepo;

impl ImportScheduleRepo {
    /// Create a schedule, returning the created row.
    ///
    /// The `uq_import_schedules_kind` constraint backs up the handler's
    /// duplicate-kind check.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportSchedule,
    ) -> Result<ImportSchedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_schedules
                (kind, frequency, active, is_full_import, start_time, days, next_run)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(&input.kind)
            .bind(&input.frequency)
            .bind(input.active)
            .bind(input.is_full_import)
            .bind(&input.start_time)
            .bind(&input.days)
            .bind(input.next_run)
            .fetch_one(pool)
            .await
    }

    /// Find a schedule by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ImportSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_schedules WHERE id = $1");
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a schedule by import kind (kinds are unique).
    pub async fn find_by_kind(
        pool: &PgPool,
        kind: &str,
    ) -> Result<Option<ImportSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_schedules WHERE kind = $1");
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(kind)
            .fetch_optional(pool)
            .await
    }

    /// List all schedules in creation order.
    pub async fn list(pool: &PgPool) -> Result<Vec<ImportSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_schedules ORDER BY id");
        sqlx::query_as::<_, ImportSchedule>(&query)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update. `None` fields keep their current value;
    /// `next_run` is only rewritten when the caller recomputed it.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateImportSchedule,
    ) -> Result<Option<ImportSchedule>, sqlx::Error> {
        let query = format!(
            "UPDATE import_schedules SET
                frequency = COALESCE($2, frequency),
                active = COALESCE($3, active),
                is_full_import = COALESCE($4, is_full_import),
                start_time = COALESCE($5, start_time),
                days = COALESCE($6, days),
                next_run = COALESCE($7, next_run),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(id)
            .bind(&input.frequency)
            .bind(input.active)
            .bind(input.is_full_import)
            .bind(&input.start_time)
            .bind(&input.days)
            .bind(input.next_run)
            .fetch_optional(pool)
            .await
    }

    /// Delete a schedule. Returns false when the row did not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active schedules whose next fire time has arrived.
    pub async fn list_due(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<ImportSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_schedules
             WHERE active AND next_run IS NOT NULL AND next_run <= $1
             ORDER BY next_run"
        );
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Record a fire: stamp `last_run` and move `next_run` forward.
    pub async fn mark_fired(
        pool: &PgPool,
        id: DbId,
        last_run: Timestamp,
        next_run: Timestamp,
    ) -> Result<Option<ImportSchedule>, sqlx::Error> {
        let query = format!(
            "UPDATE import_schedules SET
                last_run = $2,
                next_run = $3,
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSchedule>(&query)
            .bind(id)
            .bind(last_run)
            .bind(next_run)
            .fetch_optional(pool)
            .await
    }

    /// Earliest upcoming fire across active schedules, for the stats panel.
    pub async fn next_scheduled(pool: &PgPool) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT min(next_run) FROM import_schedules
             WHERE active AND next_run IS NOT NULL",
        )
        .fetch_one(pool)
        .await
    }
}
