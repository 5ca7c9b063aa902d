//! Live monitor state derived from history snapshots.

use crate::client::RunSummary;
use partsync_core::import::RunStatus;

/// Whether a history row counts as currently running for the banner and the
/// auto-refresh derivation.
fn is_running(status: &str) -> bool {
    matches!(
        RunStatus::parse(status),
        Some(RunStatus::InProgress) | Some(RunStatus::Processing)
    )
}

/// Monitor view state, rebuilt from each history fetch.
#[derive(Debug, Default)]
pub struct MonitorState {
    /// Last known-good history snapshot, newest first.
    pub history: Vec<RunSummary>,
    /// Subset of `history` that is currently running.
    pub active_runs: Vec<RunSummary>,
    /// True while anything is running; drives the "updating live" banner.
    pub auto_refresh_active: bool,
}

impl MonitorState {
    /// Replace the snapshot and re-derive the active view.
    pub fn apply(&mut self, history: Vec<RunSummary>) {
        self.active_runs = history
            .iter()
            .filter(|run| is_running(&run.status))
            .cloned()
            .collect();
        self.auto_refresh_active = !self.active_runs.is_empty();
        self.history = history;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: i64, status: &str) -> RunSummary {
        RunSummary {
            id,
            kind: "vehicles".to_string(),
            status: status.to_string(),
            progress: 0,
            processing_item: String::new(),
            total_items: 0,
            processed_items: 0,
            new_items: 0,
            updated_items: 0,
            error_count: 0,
            can_pause: false,
            can_resume: false,
            can_cancel: false,
        }
    }

    #[test]
    fn in_progress_activates_the_banner() {
        let mut monitor = MonitorState::default();
        monitor.apply(vec![run(1, "in_progress")]);

        assert!(monitor.auto_refresh_active);
        assert_eq!(monitor.active_runs.len(), 1);
    }

    #[test]
    fn processing_counts_as_running() {
        let mut monitor = MonitorState::default();
        monitor.apply(vec![run(1, "processing"), run(2, "completed")]);

        assert!(monitor.auto_refresh_active);
        assert_eq!(monitor.active_runs.len(), 1);
        assert_eq!(monitor.active_runs[0].id, 1);
    }

    #[test]
    fn completed_history_deactivates_the_banner() {
        let mut monitor = MonitorState::default();
        monitor.apply(vec![run(1, "in_progress")]);
        monitor.apply(vec![run(1, "completed")]);

        assert!(!monitor.auto_refresh_active);
        assert!(monitor.active_runs.is_empty());
    }

    #[test]
    fn paused_and_pending_do_not_activate_the_banner() {
        let mut monitor = MonitorState::default();
        monitor.apply(vec![run(1, "paused"), run(2, "pending")]);

        assert!(!monitor.auto_refresh_active);
    }
}
