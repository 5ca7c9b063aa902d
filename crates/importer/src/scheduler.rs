//! Background runner for recurring import schedules.
//!
//! A single loop scans for due schedules once a minute. A due schedule
//! fires through [`ImportRunner::start`] unless any run is already active,
//! in which case the fire is recorded as a `skipped` run so the decision
//! shows up in history. Either way `next_run` moves forward, so a skipped
//! schedule does not re-fire on the next tick.

use std::time::Duration;

use chrono::Utc;
use partsync_core::import::{ImportKind, RunStatus};
use partsync_core::schedule::{next_run, Frequency, StartTime, Weekday, DEFAULT_START_TIME};
use partsync_core::types::Timestamp;
use partsync_db::models::import_run::{CreateImportRun, RunOutcome};
use partsync_db::models::import_schedule::{ImportSchedule, UpdateImportSchedule};
use partsync_db::repositories::{ImportRunRepo, ImportScheduleRepo};
use partsync_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::options::StartOptions;
use crate::runner::ImportRunner;

/// How often the runner scans for due schedules.
const SCHEDULE_TICK: Duration = Duration::from_secs(60);

/// Background service that fires recurring imports.
pub struct ScheduleRunner {
    pool: DbPool,
    runner: ImportRunner,
}

impl ScheduleRunner {
    pub fn new(pool: DbPool, runner: ImportRunner) -> Self {
        Self { pool, runner }
    }

    /// Run the schedule loop. Exits when the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SCHEDULE_TICK);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Schedule runner cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.fire_due().await {
                        tracing::error!(error = %e, "Failed to process due schedules");
                    }
                }
            }
        }
    }

    /// Fire every schedule whose `next_run` has arrived.
    async fn fire_due(&self) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let due = ImportScheduleRepo::list_due(&self.pool, now).await?;

        for schedule in due {
            let upcoming = compute_next_run(&schedule, now);

            let Some(kind) = schedule.import_kind() else {
                tracing::warn!(
                    schedule_id = schedule.id,
                    kind = %schedule.kind,
                    "Schedule has an unknown kind, pushing it forward"
                );
                self.push_forward(&schedule, upcoming).await?;
                continue;
            };

            // One import at a time: a scheduled fire never overlaps a run
            // that is already working.
            if ImportRunRepo::count_active(&self.pool).await? > 0 {
                tracing::info!(
                    schedule_id = schedule.id,
                    kind = %kind,
                    "Skipping scheduled import, another run is active"
                );
                self.record_skip(kind, &schedule).await?;
                self.push_forward(&schedule, upcoming).await?;
                continue;
            }

            let options = StartOptions {
                full_import: schedule.is_full_import,
                ..StartOptions::default()
            };
            match self.runner.start(kind, options).await {
                Ok(run_id) => {
                    tracing::info!(
                        schedule_id = schedule.id,
                        run_id,
                        kind = %kind,
                        next_run = %upcoming,
                        "Scheduled import fired"
                    );
                    ImportScheduleRepo::mark_fired(&self.pool, schedule.id, now, upcoming)
                        .await?;
                }
                Err(e) => {
                    tracing::error!(
                        schedule_id = schedule.id,
                        error = %e,
                        "Failed to start scheduled import"
                    );
                    self.push_forward(&schedule, upcoming).await?;
                }
            }
        }

        Ok(())
    }

    /// Leave a `skipped` row in history so the suppressed fire is visible.
    async fn record_skip(
        &self,
        kind: ImportKind,
        schedule: &ImportSchedule,
    ) -> Result<(), sqlx::Error> {
        let run = ImportRunRepo::create(
            &self.pool,
            &CreateImportRun {
                kind: kind.as_str().to_string(),
                is_full_import: schedule.is_full_import,
                processing_item: "Scheduled import skipped".to_string(),
                details: serde_json::json!({ "scheduleId": schedule.id }),
            },
        )
        .await?;
        ImportRunRepo::finish(
            &self.pool,
            run.id,
            &RunOutcome {
                status: RunStatus::Skipped,
                total_items: 0,
                processed_items: 0,
                new_items: 0,
                updated_items: 0,
                deactivated_items: 0,
                error_count: 0,
                errors: "skipped: another import is already running".to_string(),
            },
        )
        .await?;
        Ok(())
    }

    /// Advance `next_run` without stamping `last_run`.
    async fn push_forward(
        &self,
        schedule: &ImportSchedule,
        upcoming: Timestamp,
    ) -> Result<(), sqlx::Error> {
        ImportScheduleRepo::update(
            &self.pool,
            schedule.id,
            &UpdateImportSchedule {
                next_run: Some(upcoming),
                ..UpdateImportSchedule::default()
            },
        )
        .await?;
        Ok(())
    }
}

/// Next fire instant for a schedule row, falling back to a one-hour delay
/// when its tokens do not parse (they are validated at creation, so this
/// only covers rows written by an older build).
pub fn compute_next_run(schedule: &ImportSchedule, now: Timestamp) -> Timestamp {
    let Some(frequency) = schedule.frequency_token() else {
        return now + chrono::Duration::hours(1);
    };
    let start_time = schedule
        .start_time
        .as_deref()
        .and_then(|raw| StartTime::parse(raw).ok())
        .or_else(|| StartTime::parse(DEFAULT_START_TIME).ok())
        // DEFAULT_START_TIME always parses.
        .expect("default start time");
    let days: Vec<Weekday> = schedule
        .days
        .iter()
        .filter_map(|d| Weekday::parse(d))
        .collect();

    next_run(now, frequency, start_time, &days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule_row(frequency: &str, start_time: Option<&str>, days: &[&str]) -> ImportSchedule {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        ImportSchedule {
            id: 1,
            kind: "vehicles".to_string(),
            frequency: frequency.to_string(),
            active: true,
            is_full_import: false,
            start_time: start_time.map(str::to_string),
            days: days.iter().map(|d| d.to_string()).collect(),
            last_run: None,
            next_run: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn next_run_uses_schedule_tokens() {
        // Monday 05:00, daily at 02:00 -> Tuesday 02:00.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap();
        let schedule = schedule_row("24h", Some("02:00"), &[]);
        assert_eq!(
            compute_next_run(&schedule, now),
            Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_defaults_start_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap();
        let schedule = schedule_row("24h", None, &[]);
        assert_eq!(
            compute_next_run(&schedule, now),
            Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_honors_day_set() {
        // Monday, allowed friday only.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap();
        let schedule = schedule_row("24h", Some("02:00"), &["friday"]);
        assert_eq!(
            compute_next_run(&schedule, now),
            Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_frequency_falls_back_to_an_hour() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap();
        let schedule = schedule_row("2h", None, &[]);
        assert_eq!(compute_next_run(&schedule, now), now + chrono::Duration::hours(1));
    }
}
