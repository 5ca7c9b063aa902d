//! The import runner: executes one run from trigger to terminal state.
//!
//! Control flow invariants:
//!
//! - The start endpoint returns as soon as the run row exists; the work
//!   itself happens in a spawned task.
//! - Pause and cancel are requested by flipping the run row's status; the
//!   page loop observes the flip at the next page boundary and stops,
//!   leaving the requested status in place. The checkpoint (`last_id`)
//!   persisted with each progress update is what resume continues from.
//! - With `auto_recovery` on, a failed batch falls back to row-by-row
//!   upserts and the run keeps going, finishing as `partial` when any
//!   errors were collected. With it off, the first failure fails the run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use partsync_core::import::{
    ImportKind, RunStatus, COMPLETE_IMPORT_EPOCH, INCREMENTAL_WINDOW_DAYS,
};
use partsync_core::types::DbId;
use partsync_db::models::catalog::{UpsertPart, UpsertVehicle};
use partsync_db::models::import_run::{CreateImportRun, ImportRun, RunOutcome, RunProgress};
use partsync_db::repositories::{CatalogRepo, ImportRunRepo};
use partsync_db::DbPool;
use partsync_events::{EventBus, SyncEvent};
use partsync_supplier::{RawPart, RawVehicle, SupplierClient, SupplierError};

use crate::options::{RunDetails, StartOptions};

/// Errors the engine can hit while executing a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Supplier(#[from] SupplierError),
}

/// Why a phase loop stopped before finishing its feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseEnd {
    Completed,
    /// The run row was flipped to this status while the phase was working.
    Interrupted(RunStatus),
}

/// Counters accumulated across the phases of one run.
#[derive(Debug, Default)]
struct Totals {
    total: i32,
    processed: i32,
    new: i32,
    updated: i32,
    deactivated: i32,
    errors: Vec<String>,
}

/// Progress window a phase reports into (sequential runs split 0-50-99).
type ProgressWindow = (i32, i32);

const FULL_WINDOW: ProgressWindow = (0, 100);

/// Executes import runs against the supplier feeds.
#[derive(Clone)]
pub struct ImportRunner {
    pool: DbPool,
    supplier: Arc<SupplierClient>,
    bus: Arc<EventBus>,
}

impl ImportRunner {
    pub fn new(pool: DbPool, supplier: Arc<SupplierClient>, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            supplier,
            bus,
        }
    }

    /// Create a run row and start executing in the background.
    ///
    /// Returns the run id as soon as the row exists; progress is observable
    /// through the history endpoint and the event stream.
    pub async fn start(
        &self,
        kind: ImportKind,
        options: StartOptions,
    ) -> Result<DbId, sqlx::Error> {
        let details = RunDetails::new(options.clone());
        let run = ImportRunRepo::create(
            &self.pool,
            &CreateImportRun {
                kind: kind.as_str().to_string(),
                is_full_import: options.full_import,
                processing_item: format!("Starting {kind} import"),
                details: details.to_value(),
            },
        )
        .await?;

        tracing::info!(
            run_id = run.id,
            kind = %kind,
            full_import = options.full_import,
            "Import run created"
        );
        self.bus.publish(
            SyncEvent::new("run.started").with_run(run.id).with_payload(
                serde_json::json!({ "kind": kind.as_str(), "fullImport": options.full_import }),
            ),
        );

        let engine = self.clone();
        tokio::spawn(async move {
            engine.execute(run.id, kind, options, details).await;
        });

        Ok(run.id)
    }

    /// Continue a run from its stored options and checkpoint.
    ///
    /// The caller has already validated the transition and moved the row
    /// back to `in_progress`.
    pub fn spawn_resume(&self, run: ImportRun) {
        let Some(kind) = ImportKind::parse(&run.kind) else {
            tracing::warn!(run_id = run.id, kind = %run.kind, "Cannot resume run with unknown kind");
            return;
        };
        let details = RunDetails::from_value(&run.details);
        let options = details.options.clone().unwrap_or_default();

        tracing::info!(run_id = run.id, kind = %kind, last_id = details.last_id, "Resuming import run");
        self.bus.publish(
            SyncEvent::new("run.resumed")
                .with_run(run.id)
                .with_payload(serde_json::json!({ "lastId": details.last_id })),
        );

        let engine = self.clone();
        tokio::spawn(async move {
            engine.execute(run.id, kind, options, details).await;
        });
    }

    /// Recompute per-vehicle part counters. Maintenance action, not a run.
    pub async fn recount(&self) -> Result<i64, sqlx::Error> {
        let updated = CatalogRepo::recount_vehicle_parts(&self.pool).await?;
        tracing::info!(updated, "Vehicle part counters recomputed");
        self.bus.publish(
            SyncEvent::new("maintenance.recount")
                .with_payload(serde_json::json!({ "updated": updated })),
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    async fn execute(
        self,
        run_id: DbId,
        kind: ImportKind,
        options: StartOptions,
        details: RunDetails,
    ) {
        let mut totals = Totals::default();
        let result = self
            .execute_phases(run_id, kind, &options, details, &mut totals)
            .await;

        match result {
            Ok(PhaseEnd::Completed) => {
                let status = if totals.errors.is_empty() {
                    RunStatus::Completed
                } else {
                    RunStatus::Partial
                };
                self.finish_run(run_id, status, &totals).await;
            }
            Ok(PhaseEnd::Interrupted(status)) => {
                // The control endpoint already wrote the status; the
                // checkpoint went out with the last progress update.
                tracing::info!(run_id, status = %status, "Import run interrupted");
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "Import run failed");
                totals.errors.push(e.to_string());
                self.finish_run(run_id, RunStatus::Failed, &totals).await;
            }
        }
    }

    async fn execute_phases(
        &self,
        run_id: DbId,
        kind: ImportKind,
        options: &StartOptions,
        mut details: RunDetails,
        totals: &mut Totals,
    ) -> Result<PhaseEnd, EngineError> {
        match kind {
            ImportKind::Vehicles => {
                self.vehicle_phase(run_id, options, &mut details, totals, FULL_WINDOW)
                    .await
            }
            ImportKind::Parts => {
                self.part_phase(run_id, options, &mut details, totals, FULL_WINDOW)
                    .await
            }
            ImportKind::All => {
                // Sequential order matters: vehicles first so parts can link
                // against them, relations resolved once both are in.
                if details.phase.as_deref() != Some("parts") {
                    details.phase = Some("vehicles".to_string());
                    let end = self
                        .vehicle_phase(run_id, options, &mut details, totals, (0, 50))
                        .await?;
                    if let PhaseEnd::Interrupted(status) = end {
                        return Ok(PhaseEnd::Interrupted(status));
                    }
                    details.phase = Some("parts".to_string());
                    details.last_id = 0;
                }

                let end = self
                    .part_phase(run_id, options, &mut details, totals, (50, 99))
                    .await?;
                if let PhaseEnd::Interrupted(status) = end {
                    return Ok(PhaseEnd::Interrupted(status));
                }

                self.update_progress(run_id, 99, "Resolving part/vehicle relations", totals, &details)
                    .await?;
                let linked = CatalogRepo::resolve_pending_part_links(&self.pool).await?;
                tracing::info!(run_id, linked, "Pending part relations resolved");
                Ok(PhaseEnd::Completed)
            }
        }
    }

    async fn vehicle_phase(
        &self,
        run_id: DbId,
        options: &StartOptions,
        details: &mut RunDetails,
        totals: &mut Totals,
        window: ProgressWindow,
    ) -> Result<PhaseEnd, EngineError> {
        let since = cutoff_date(options, Utc::now());
        tracing::info!(run_id, %since, full = options.full_import, "Vehicle phase starting");

        if let Ok(expected) = self.supplier.vehicle_count(since).await {
            totals.total += expected.min(i32::MAX as i64) as i32;
        }

        let mut seen_refs: Vec<i64> = Vec::new();
        let mut page_no = 0u32;

        loop {
            if let Some(status) = self.control_requested(run_id).await? {
                return Ok(PhaseEnd::Interrupted(status));
            }

            page_no += 1;
            let page = match self
                .supplier
                .vehicle_changes(since, details.last_id, options.batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) if options.auto_recovery => {
                    totals.errors.push(format!("vehicle feed page {page_no}: {e}"));
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if page.vehicles.is_empty() {
                break;
            }
            let page_len = page.vehicles.len();

            let batch = normalize_vehicles(&page.vehicles);
            seen_refs.extend(batch.iter().map(|v| v.supplier_ref));

            match CatalogRepo::upsert_vehicles(&self.pool, &batch).await {
                Ok(outcome) => {
                    totals.new += outcome.inserted as i32;
                    totals.updated += outcome.updated as i32;
                }
                Err(e) if options.auto_recovery => {
                    tracing::warn!(run_id, error = %e, "Vehicle batch failed, retrying rows individually");
                    for row in &batch {
                        match CatalogRepo::upsert_vehicles(&self.pool, std::slice::from_ref(row))
                            .await
                        {
                            Ok(outcome) => {
                                totals.new += outcome.inserted as i32;
                                totals.updated += outcome.updated as i32;
                            }
                            Err(row_err) => totals
                                .errors
                                .push(format!("vehicle {}: {row_err}", row.supplier_ref)),
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }

            totals.processed += page_len as i32;

            let next_cursor = advance_cursor(
                details.last_id,
                page.result_set.last_id,
                batch.last().map(|v| v.supplier_ref),
            );
            let stalled = next_cursor <= details.last_id;
            details.last_id = next_cursor;

            let progress = scale_progress(totals.processed, totals.total, window);
            self.update_progress(
                run_id,
                progress,
                &format!("Importing vehicles (page {page_no})"),
                totals,
                details,
            )
            .await?;

            if stalled || page_len < options.batch_size as usize {
                break;
            }
        }

        if options.full_import && !seen_refs.is_empty() {
            let gone = CatalogRepo::deactivate_vehicles_not_in(&self.pool, &seen_refs).await?;
            totals.deactivated += gone as i32;
            tracing::info!(run_id, deactivated = gone, "Vehicles absent upstream deactivated");
        }

        // Parts may have arrived before their vehicle in an earlier run.
        let linked = CatalogRepo::resolve_pending_part_links(&self.pool).await?;
        if linked > 0 {
            tracing::info!(run_id, linked, "Pending part relations resolved after vehicle phase");
        }

        Ok(PhaseEnd::Completed)
    }

    async fn part_phase(
        &self,
        run_id: DbId,
        options: &StartOptions,
        details: &mut RunDetails,
        totals: &mut Totals,
        window: ProgressWindow,
    ) -> Result<PhaseEnd, EngineError> {
        let since = cutoff_date(options, Utc::now());
        tracing::info!(run_id, %since, full = options.full_import, "Part phase starting");

        if let Ok(expected) = self.supplier.part_count(since).await {
            totals.total += expected.min(i32::MAX as i64) as i32;
        }

        let mut seen_refs: Vec<i64> = Vec::new();
        let mut page_no = 0u32;

        loop {
            if let Some(status) = self.control_requested(run_id).await? {
                return Ok(PhaseEnd::Interrupted(status));
            }

            page_no += 1;
            let page = match self
                .supplier
                .part_changes(since, details.last_id, options.batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) if options.auto_recovery => {
                    totals.errors.push(format!("part feed page {page_no}: {e}"));
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if page.parts.is_empty() {
                break;
            }
            let page_len = page.parts.len();

            let batch = normalize_parts(&page.parts);
            seen_refs.extend(batch.iter().map(|p| p.supplier_ref));

            match CatalogRepo::upsert_parts(&self.pool, &batch).await {
                Ok(outcome) => {
                    totals.new += outcome.inserted as i32;
                    totals.updated += outcome.updated as i32;
                }
                Err(e) if options.auto_recovery => {
                    tracing::warn!(run_id, error = %e, "Part batch failed, retrying rows individually");
                    for row in &batch {
                        match CatalogRepo::upsert_parts(&self.pool, std::slice::from_ref(row)).await
                        {
                            Ok(outcome) => {
                                totals.new += outcome.inserted as i32;
                                totals.updated += outcome.updated as i32;
                            }
                            Err(row_err) => totals
                                .errors
                                .push(format!("part {}: {row_err}", row.supplier_ref)),
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }

            totals.processed += page_len as i32;

            let next_cursor = advance_cursor(
                details.last_id,
                page.result_set.last_id,
                batch.last().map(|p| p.supplier_ref),
            );
            let stalled = next_cursor <= details.last_id;
            details.last_id = next_cursor;

            let progress = scale_progress(totals.processed, totals.total, window);
            self.update_progress(
                run_id,
                progress,
                &format!("Importing parts (page {page_no})"),
                totals,
                details,
            )
            .await?;

            if stalled || page_len < options.batch_size as usize {
                break;
            }
        }

        if options.full_import && !seen_refs.is_empty() {
            let gone = CatalogRepo::deactivate_parts_not_in(&self.pool, &seen_refs).await?;
            totals.deactivated += gone as i32;
            tracing::info!(run_id, deactivated = gone, "Parts absent upstream deactivated");
        }

        Ok(PhaseEnd::Completed)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Re-read the run row to observe pause/cancel requests. A deleted row
    /// counts as cancelled.
    async fn control_requested(&self, run_id: DbId) -> Result<Option<RunStatus>, EngineError> {
        let run = ImportRunRepo::find_by_id(&self.pool, run_id).await?;
        Ok(match run.and_then(|r| r.run_status()) {
            None => Some(RunStatus::Cancelled),
            Some(status) if status == RunStatus::Paused || status == RunStatus::Cancelled => {
                Some(status)
            }
            Some(_) => None,
        })
    }

    async fn update_progress(
        &self,
        run_id: DbId,
        progress: i32,
        item: &str,
        totals: &Totals,
        details: &RunDetails,
    ) -> Result<(), EngineError> {
        ImportRunRepo::update_progress(
            &self.pool,
            run_id,
            &RunProgress {
                progress,
                processing_item: item.to_string(),
                total_items: totals.total.max(totals.processed),
                processed_items: totals.processed,
                new_items: totals.new,
                updated_items: totals.updated,
                details: details.to_value(),
            },
        )
        .await?;

        self.bus.publish(
            SyncEvent::new("run.progress").with_run(run_id).with_payload(
                serde_json::json!({ "progress": progress, "processedItems": totals.processed }),
            ),
        );
        Ok(())
    }

    async fn finish_run(&self, run_id: DbId, status: RunStatus, totals: &Totals) {
        let outcome = RunOutcome {
            status,
            total_items: totals.total.max(totals.processed),
            processed_items: totals.processed,
            new_items: totals.new,
            updated_items: totals.updated,
            deactivated_items: totals.deactivated,
            error_count: totals.errors.len() as i32,
            errors: totals.errors.join("; "),
        };
        if let Err(e) = ImportRunRepo::finish(&self.pool, run_id, &outcome).await {
            tracing::error!(run_id, error = %e, "Failed to persist run outcome");
        }

        tracing::info!(
            run_id,
            status = %status,
            new_items = totals.new,
            updated_items = totals.updated,
            error_count = totals.errors.len(),
            "Import run finished"
        );
        self.bus.publish(
            SyncEvent::new("run.finished")
                .with_run(run_id)
                .with_payload(serde_json::json!({ "status": status.as_str() })),
        );
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Resolve the feed cutoff for a run.
fn cutoff_date(options: &StartOptions, now: DateTime<Utc>) -> DateTime<Utc> {
    if options.full_import {
        return COMPLETE_IMPORT_EPOCH
            .parse()
            .unwrap_or_else(|_| now - chrono::Duration::days(365 * 30));
    }
    match options.from_date {
        Some(date) => date
            .and_time(NaiveTime::MIN)
            .and_utc(),
        None => now - chrono::Duration::days(INCREMENTAL_WINDOW_DAYS),
    }
}

/// Map a processed/total pair into a progress window, never reaching the
/// window's end (the finish write owns 100).
fn scale_progress(processed: i32, total: i32, window: ProgressWindow) -> i32 {
    let (start, end) = window;
    let span = (end - start).max(1);
    let fraction = if total > 0 {
        f64::from(processed.min(total)) / f64::from(total)
    } else {
        0.5
    };
    (start + (fraction * f64::from(span)) as i32).min(end - 1).max(start)
}

/// Feed pages occasionally repeat a record; the upsert requires unique refs
/// within a statement, so keep the last occurrence of each.
fn dedupe_last<T, K: std::hash::Hash + Eq + Copy>(items: &[T], key: impl Fn(&T) -> K) -> Vec<&T> {
    let mut index: HashMap<K, usize> = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        index.insert(key(item), i);
    }
    let mut picked: Vec<usize> = index.into_values().collect();
    picked.sort_unstable();
    picked.into_iter().map(|i| &items[i]).collect()
}

fn normalize_vehicles(raw: &[RawVehicle]) -> Vec<UpsertVehicle> {
    dedupe_last(raw, |v| v.id_local)
        .into_iter()
        .map(|v| UpsertVehicle {
            supplier_ref: v.id_local,
            make: v.make.trim().to_string(),
            model: v.model.trim().to_string(),
            trim_level: v.trim_level.trim().to_string(),
            year: v.year,
            fuel: v.fuel.trim().to_string(),
        })
        .collect()
}

fn normalize_parts(raw: &[RawPart]) -> Vec<UpsertPart> {
    dedupe_last(raw, |p| p.ref_local)
        .into_iter()
        .map(|p| {
            let price_cents = p.price_cents();
            UpsertPart {
                supplier_ref: p.ref_local,
                vehicle_ref: p.id_vehiculo,
                family: p.family.trim().to_string(),
                description: p.description.trim().to_string(),
                price_cents,
                // Zero-priced parts are not sellable and stay hidden.
                active: price_cents > 0,
            }
        })
        .collect()
}

/// Pick the next pagination cursor: trust the feed's `result_set.lastId`
/// when present, fall back to the last record of the page.
fn advance_cursor(current: i64, result_set_last: i64, page_last: Option<i64>) -> i64 {
    if result_set_last > current {
        result_set_last
    } else {
        page_last.unwrap_or(current).max(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
