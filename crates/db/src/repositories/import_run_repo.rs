//! Repository for the `import_runs` table.

use partsync_core::import::RunStatus;
use partsync_core::search::{clamp_limit, clamp_offset, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use partsync_core::types::DbId;
use sqlx::PgPool;

use crate::models::import_run::{
    CreateImportRun, ImportRun, KindTotals, RunOutcome, RunProgress, RunTotals,
};

/// Column list for import_runs queries.
const COLUMNS: &str = "id, kind, status, is_full_import, progress, processing_item, \
    total_items, processed_items, new_items, updated_items, deactivated_items, \
    error_count, errors, details, started_at, ended_at, last_updated";

/// Statuses that make a run count as active for guard queries.
const ACTIVE_STATUSES: &str = "('pending', 'in_progress', 'processing')";

/// Provides CRUD and aggregate operations for import runs.
pub struct ImportRunRepo;

impl ImportRunRepo {
    /// Create a new run, returning the created row.
    ///
    /// Runs start in `in_progress`; the engine picks them up immediately.
    pub async fn create(pool: &PgPool, input: &CreateImportRun) -> Result<ImportRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_runs (kind, is_full_import, processing_item, details)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(&input.kind)
            .bind(input.is_full_import)
            .bind(&input.processing_item)
            .bind(&input.details)
            .fetch_one(pool)
            .await
    }

    /// Find a run by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_runs WHERE id = $1");
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs newest-first.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ImportRun>, sqlx::Error> {
        let limit = clamp_limit(limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
        let offset = clamp_offset(offset);
        let query = format!(
            "SELECT {COLUMNS} FROM import_runs
             ORDER BY started_at DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Number of runs currently occupying the engine.
    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT count(*) FROM import_runs WHERE status IN {ACTIVE_STATUSES}");
        sqlx::query_scalar(&query).fetch_one(pool).await
    }

    /// Move a run to a new status. Cancellation also stamps the end time.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RunStatus,
        processing_item: &str,
    ) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!(
            "UPDATE import_runs SET
                status = $2,
                processing_item = $3,
                ended_at = CASE WHEN $2 = 'cancelled' THEN now() ELSE ended_at END,
                last_updated = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(processing_item)
            .fetch_optional(pool)
            .await
    }

    /// Persist incremental progress and the resume checkpoint.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        progress: &RunProgress,
    ) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!(
            "UPDATE import_runs SET
                progress = $2,
                processing_item = $3,
                total_items = $4,
                processed_items = $5,
                new_items = $6,
                updated_items = $7,
                details = $8,
                last_updated = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .bind(progress.progress)
            .bind(&progress.processing_item)
            .bind(progress.total_items)
            .bind(progress.processed_items)
            .bind(progress.new_items)
            .bind(progress.updated_items)
            .bind(&progress.details)
            .fetch_optional(pool)
            .await
    }

    /// Write the final counters and terminal status for a run.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        outcome: &RunOutcome,
    ) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!(
            "UPDATE import_runs SET
                status = $2,
                progress = 100,
                total_items = $3,
                processed_items = $4,
                new_items = $5,
                updated_items = $6,
                deactivated_items = $7,
                error_count = $8,
                errors = $9,
                ended_at = now(),
                last_updated = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .bind(outcome.status.as_str())
            .bind(outcome.total_items)
            .bind(outcome.processed_items)
            .bind(outcome.new_items)
            .bind(outcome.updated_items)
            .bind(outcome.deactivated_items)
            .bind(outcome.error_count)
            .bind(&outcome.errors)
            .fetch_optional(pool)
            .await
    }

    /// Delete one run. Returns false when the row did not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_runs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every run, returning how many rows went away.
    ///
    /// The caller is responsible for refusing this while runs are active.
    pub async fn delete_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_runs").execute(pool).await?;
        Ok(result.rows_affected() as i64)
    }

    /// Reset the counter columns on every run without deleting history.
    pub async fn reset_counters(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_runs SET
                total_items = 0,
                processed_items = 0,
                new_items = 0,
                updated_items = 0,
                deactivated_items = 0,
                last_updated = now()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }

    /// Aggregate counters across all runs.
    pub async fn totals(pool: &PgPool) -> Result<RunTotals, sqlx::Error> {
        sqlx::query_as::<_, RunTotals>(
            "SELECT
                count(*) AS total_runs,
                count(*) FILTER (WHERE status = 'completed') AS completed_runs,
                max(ended_at) AS last_finished
             FROM import_runs",
        )
        .fetch_one(pool)
        .await
    }

    /// Summed item counters for one import kind.
    pub async fn kind_totals(pool: &PgPool, kind: &str) -> Result<KindTotals, sqlx::Error> {
        sqlx::query_as::<_, KindTotals>(
            "SELECT
                COALESCE(sum(total_items), 0)::BIGINT AS total_items,
                COALESCE(sum(new_items), 0)::BIGINT AS new_items,
                COALESCE(sum(updated_items), 0)::BIGINT AS updated_items
             FROM import_runs
             WHERE kind = $1",
        )
        .bind(kind)
        .fetch_one(pool)
        .await
    }
}
