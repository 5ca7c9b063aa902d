//! Repository for the catalog tables (`vehicles`, `parts`).
//!
//! Batch upserts use `UNNEST` so a whole supplier page lands in one
//! statement. `(xmax = 0)` distinguishes freshly inserted rows from
//! conflict-updated ones, which is how the run counters tell "new" from
//! "updated".

use sqlx::PgPool;

use crate::models::catalog::{BatchOutcome, Part, UpsertPart, UpsertVehicle, Vehicle};

const VEHICLE_COLUMNS: &str =
    "id, supplier_ref, make, model, trim_level, year, fuel, part_count, active, synced_at";

const PART_COLUMNS: &str = "id, supplier_ref, vehicle_ref, vehicle_id, family, description, \
    price_cents, active, synced_at";

/// Provides batch sync operations for the catalog.
pub struct CatalogRepo;

impl CatalogRepo {
    /// Upsert a page of vehicles.
    ///
    /// `supplier_ref` must be unique within the batch; the importer dedupes
    /// pages before calling.
    pub async fn upsert_vehicles(
        pool: &PgPool,
        batch: &[UpsertVehicle],
    ) -> Result<BatchOutcome, sqlx::Error> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut refs = Vec::with_capacity(batch.len());
        let mut makes = Vec::with_capacity(batch.len());
        let mut models = Vec::with_capacity(batch.len());
        let mut trims = Vec::with_capacity(batch.len());
        let mut years = Vec::with_capacity(batch.len());
        let mut fuels = Vec::with_capacity(batch.len());
        for v in batch {
            refs.push(v.supplier_ref);
            makes.push(v.make.clone());
            models.push(v.model.clone());
            trims.push(v.trim_level.clone());
            years.push(v.year);
            fuels.push(v.fuel.clone());
        }

        let inserted_flags: Vec<bool> = sqlx::query_scalar(
            "INSERT INTO vehicles (supplier_ref, make, model, trim_level, year, fuel, active, synced_at)
             SELECT u.supplier_ref, u.make, u.model, u.trim_level, u.year, u.fuel, TRUE, now()
             FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::INTEGER[], $6::TEXT[])
                 AS u(supplier_ref, make, model, trim_level, year, fuel)
             ON CONFLICT (supplier_ref) DO UPDATE SET
                 make = EXCLUDED.make,
                 model = EXCLUDED.model,
                 trim_level = EXCLUDED.trim_level,
                 year = EXCLUDED.year,
                 fuel = EXCLUDED.fuel,
                 active = TRUE,
                 synced_at = now()
             RETURNING (xmax = 0)",
        )
        .bind(&refs)
        .bind(&makes)
        .bind(&models)
        .bind(&trims)
        .bind(&years)
        .bind(&fuels)
        .fetch_all(pool)
        .await?;

        Ok(outcome_from_flags(&inserted_flags))
    }

    /// Upsert a page of parts.
    ///
    /// The vehicle link is resolved in the same statement: parts whose
    /// `vehicle_ref` matches no imported vehicle keep `vehicle_id` NULL and
    /// wait for [`CatalogRepo::resolve_pending_part_links`].
    pub async fn upsert_parts(
        pool: &PgPool,
        batch: &[UpsertPart],
    ) -> Result<BatchOutcome, sqlx::Error> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut refs = Vec::with_capacity(batch.len());
        let mut vehicle_refs = Vec::with_capacity(batch.len());
        let mut families = Vec::with_capacity(batch.len());
        let mut descriptions = Vec::with_capacity(batch.len());
        let mut prices = Vec::with_capacity(batch.len());
        let mut actives = Vec::with_capacity(batch.len());
        for p in batch {
            refs.push(p.supplier_ref);
            vehicle_refs.push(p.vehicle_ref);
            families.push(p.family.clone());
            descriptions.push(p.description.clone());
            prices.push(p.price_cents);
            actives.push(p.active);
        }

        let inserted_flags: Vec<bool> = sqlx::query_scalar(
            "INSERT INTO parts
                 (supplier_ref, vehicle_ref, vehicle_id, family, description, price_cents, active, synced_at)
             SELECT u.supplier_ref, u.vehicle_ref, v.id, u.family, u.description,
                    u.price_cents, u.active, now()
             FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TEXT[], $4::TEXT[], $5::BIGINT[], $6::BOOLEAN[])
                 AS u(supplier_ref, vehicle_ref, family, description, price_cents, active)
             LEFT JOIN vehicles v ON v.supplier_ref = u.vehicle_ref
             ON CONFLICT (supplier_ref) DO UPDATE SET
                 vehicle_ref = EXCLUDED.vehicle_ref,
                 vehicle_id = COALESCE(EXCLUDED.vehicle_id, parts.vehicle_id),
                 family = EXCLUDED.family,
                 description = EXCLUDED.description,
                 price_cents = EXCLUDED.price_cents,
                 active = EXCLUDED.active,
                 synced_at = now()
             RETURNING (xmax = 0)",
        )
        .bind(&refs)
        .bind(&vehicle_refs)
        .bind(&families)
        .bind(&descriptions)
        .bind(&prices)
        .bind(&actives)
        .fetch_all(pool)
        .await?;

        Ok(outcome_from_flags(&inserted_flags))
    }

    /// Deactivate vehicles whose supplier_ref was not seen during a complete
    /// import. Returns how many rows were deactivated.
    pub async fn deactivate_vehicles_not_in(
        pool: &PgPool,
        seen_refs: &[i64],
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vehicles SET active = FALSE, synced_at = now()
             WHERE active AND NOT (supplier_ref = ANY($1))",
        )
        .bind(seen_refs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }

    /// Deactivate parts whose supplier_ref was not seen during a complete
    /// import. Returns how many rows were deactivated.
    pub async fn deactivate_parts_not_in(
        pool: &PgPool,
        seen_refs: &[i64],
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE parts SET active = FALSE, synced_at = now()
             WHERE active AND NOT (supplier_ref = ANY($1))",
        )
        .bind(seen_refs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }

    /// Link parts that arrived before their vehicle. Returns how many
    /// pending relations were resolved.
    pub async fn resolve_pending_part_links(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE parts p SET vehicle_id = v.id
             FROM vehicles v
             WHERE p.vehicle_id IS NULL AND v.supplier_ref = p.vehicle_ref",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }

    /// Recompute `part_count` for every vehicle from its active linked parts.
    /// Returns how many vehicle rows were touched.
    pub async fn recount_vehicle_parts(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vehicles SET part_count = sub.cnt
             FROM (
                 SELECT v.id, count(p.id) FILTER (WHERE p.active)::INTEGER AS cnt
                 FROM vehicles v
                 LEFT JOIN parts p ON p.vehicle_id = v.id
                 GROUP BY v.id
             ) sub
             WHERE vehicles.id = sub.id AND vehicles.part_count IS DISTINCT FROM sub.cnt",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i64)
    }

    /// Most recently synced vehicles, for the raw diagnostic probe.
    pub async fn latest_vehicles(pool: &PgPool, limit: i64) -> Result<Vec<Vehicle>, sqlx::Error> {
        let query = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY synced_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, Vehicle>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Most recently synced parts, for the raw diagnostic probe.
    pub async fn latest_parts(pool: &PgPool, limit: i64) -> Result<Vec<Part>, sqlx::Error> {
        let query = format!("SELECT {PART_COLUMNS} FROM parts ORDER BY synced_at DESC LIMIT $1");
        sqlx::query_as::<_, Part>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Row counts for the diagnostic snapshot.
    pub async fn vehicle_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM vehicles")
            .fetch_one(pool)
            .await
    }

    pub async fn part_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM parts")
            .fetch_one(pool)
            .await
    }
}

fn outcome_from_flags(inserted_flags: &[bool]) -> BatchOutcome {
    let inserted = inserted_flags.iter().filter(|f| **f).count() as i64;
    BatchOutcome {
        inserted,
        updated: inserted_flags.len() as i64 - inserted,
    }
}
