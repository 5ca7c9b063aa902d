//! Import vocabulary and the run status state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by the
//! API/repository layer, the import engine, and the admin console alike. The
//! capability predicates below are the single source of truth for which
//! control actions the history endpoint advertises and which transitions the
//! control endpoints accept.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ImportKind / ImportMode
// ---------------------------------------------------------------------------

/// What an import run synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Vehicles,
    Parts,
    /// Vehicles, then parts, then relation resolution, in sequence.
    All,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicles => "vehicles",
            Self::Parts => "parts",
            Self::All => "all",
        }
    }

    /// Parse a wire token (`"vehicles"`, `"parts"`, `"all"`).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "vehicles" => Some(Self::Vehicles),
            "parts" => Some(Self::Parts),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far back an import reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Only records changed since a cutoff (default: last 7 days).
    Incremental,
    /// Full resynchronization; also deactivates records gone upstream.
    Complete,
}

impl ImportMode {
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn from_full_flag(full_import: bool) -> Self {
        if full_import {
            Self::Complete
        } else {
            Self::Incremental
        }
    }
}

/// Number of days an incremental import looks back when no explicit
/// cutoff date is given.
pub const INCREMENTAL_WINDOW_DAYS: i64 = 7;

/// Cutoff used for complete imports: far enough back to cover everything.
pub const COMPLETE_IMPORT_EPOCH: &str = "2000-01-01T00:00:00Z";

/// Allowed batch sizes for supplier page requests.
pub const BATCH_SIZES: &[i32] = &[500, 1000, 2000];

/// Default supplier page size.
pub const DEFAULT_BATCH_SIZE: i32 = 1000;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Processing,
    Completed,
    /// Finished, but some batches collected errors.
    Partial,
    Failed,
    Paused,
    Cancelled,
    /// A scheduled fire that was suppressed because another run was active.
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            "paused" => Some(Self::Paused),
            "cancelled" => Some(Self::Cancelled),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// A run that is still occupying the import engine.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Processing)
    }

    /// A run that will make no further progress on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Skipped
        )
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, Self::InProgress | Self::Processing)
    }

    /// Paused runs resume from their checkpoint; failed and partial runs
    /// may be retried the same way.
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Paused | Self::Failed | Self::Partial)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::InProgress | Self::Processing | Self::Paused
        )
    }

    /// History rows can only be deleted once the run is no longer active.
    pub fn can_delete(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Control actions
// ---------------------------------------------------------------------------

/// A control command issued against a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
        }
    }

    /// The status a run moves to when this action is applied.
    pub fn target_status(&self) -> RunStatus {
        match self {
            Self::Pause => RunStatus::Paused,
            Self::Resume => RunStatus::InProgress,
            Self::Cancel => RunStatus::Cancelled,
        }
    }

    /// Check whether this action is allowed from `from`.
    pub fn allowed_from(&self, from: RunStatus) -> bool {
        match self {
            Self::Pause => from.can_pause(),
            // Resume-as-control only applies to paused runs; failed/partial
            // retries go through the start endpoint with a checkpoint.
            Self::Resume => from == RunStatus::Paused,
            Self::Cancel => from.can_cancel(),
        }
    }

    /// Validate a transition, returning a message naming the current status
    /// for invalid ones.
    pub fn validate(&self, from: RunStatus) -> Result<RunStatus, String> {
        if self.allowed_from(from) {
            Ok(self.target_status())
        } else {
            Err(format!(
                "cannot {} an import run in status '{}'",
                self.as_str(),
                from
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Token round-trips
    // -----------------------------------------------------------------------

    #[test]
    fn kind_tokens_parse() {
        assert_eq!(ImportKind::parse("vehicles"), Some(ImportKind::Vehicles));
        assert_eq!(ImportKind::parse("parts"), Some(ImportKind::Parts));
        assert_eq!(ImportKind::parse("all"), Some(ImportKind::All));
        assert_eq!(ImportKind::parse("orders"), None);
    }

    #[test]
    fn status_tokens_parse() {
        for status in [
            RunStatus::Pending,
            RunStatus::InProgress,
            RunStatus::Processing,
            RunStatus::Completed,
            RunStatus::Partial,
            RunStatus::Failed,
            RunStatus::Paused,
            RunStatus::Cancelled,
            RunStatus::Skipped,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("running"), None);
    }

    // -----------------------------------------------------------------------
    // Capability predicates
    // -----------------------------------------------------------------------

    #[test]
    fn active_statuses() {
        assert!(RunStatus::InProgress.is_active());
        assert!(RunStatus::Processing.is_active());
        assert!(RunStatus::Pending.is_active());
        assert!(!RunStatus::Paused.is_active());
        assert!(!RunStatus::Completed.is_active());
    }

    #[test]
    fn pause_only_while_running() {
        assert!(RunStatus::InProgress.can_pause());
        assert!(RunStatus::Processing.can_pause());
        assert!(!RunStatus::Pending.can_pause());
        assert!(!RunStatus::Paused.can_pause());
        assert!(!RunStatus::Completed.can_pause());
    }

    #[test]
    fn cancel_covers_paused_and_pending() {
        assert!(RunStatus::Paused.can_cancel());
        assert!(RunStatus::Pending.can_cancel());
        assert!(RunStatus::InProgress.can_cancel());
        assert!(!RunStatus::Cancelled.can_cancel());
        assert!(!RunStatus::Completed.can_cancel());
    }

    #[test]
    fn delete_refused_while_active() {
        assert!(!RunStatus::InProgress.can_delete());
        assert!(!RunStatus::Pending.can_delete());
        assert!(RunStatus::Paused.can_delete());
        assert!(RunStatus::Failed.can_delete());
        assert!(RunStatus::Completed.can_delete());
    }

    // -----------------------------------------------------------------------
    // Control transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pause_transition_valid() {
        assert_eq!(
            ControlAction::Pause.validate(RunStatus::InProgress),
            Ok(RunStatus::Paused)
        );
    }

    #[test]
    fn resume_requires_paused() {
        assert_eq!(
            ControlAction::Resume.validate(RunStatus::Paused),
            Ok(RunStatus::InProgress)
        );
        assert!(ControlAction::Resume.validate(RunStatus::Failed).is_err());
        assert!(ControlAction::Resume
            .validate(RunStatus::InProgress)
            .is_err());
    }

    #[test]
    fn cancel_from_terminal_rejected_with_status_in_message() {
        let err = ControlAction::Cancel
            .validate(RunStatus::Completed)
            .unwrap_err();
        assert!(err.contains("completed"));
        assert!(err.contains("cancel"));
    }

    #[test]
    fn mode_from_full_flag() {
        assert_eq!(ImportMode::from_full_flag(true), ImportMode::Complete);
        assert_eq!(ImportMode::from_full_flag(false), ImportMode::Incremental);
        assert!(ImportMode::Complete.is_full());
    }
}
