//! Schedule manager state: the cached list plus the editing draft.
//!
//! Editing never mutates the cached record: `begin_edit` copies the row
//! into a draft, `cancel_edit` throws the draft away without any server
//! call, and only `save_edit` (on the console) turns the draft into a PUT.

use partsync_core::schedule::Frequency;
use partsync_core::types::DbId;

use crate::client::{ScheduleDraft, SchedulePatch, ScheduleRecord};

/// An in-flight edit of one schedule.
#[derive(Debug, Clone)]
pub struct EditingSchedule {
    pub id: DbId,
    pub frequency: String,
    pub active: bool,
    pub is_full_import: bool,
    pub start_time: Option<String>,
    pub days: Vec<String>,
}

impl EditingSchedule {
    fn from_record(record: &ScheduleRecord) -> Self {
        Self {
            id: record.id,
            frequency: record.frequency.clone(),
            active: record.active,
            is_full_import: record.is_full_import,
            start_time: record.start_time.clone(),
            days: record.days.clone(),
        }
    }

    /// The partial update a saved draft turns into.
    pub fn as_patch(&self) -> SchedulePatch {
        SchedulePatch {
            frequency: Some(self.frequency.clone()),
            active: Some(self.active),
            is_full_import: Some(self.is_full_import),
            start_time: self.start_time.clone(),
            days: Some(self.days.clone()),
        }
    }
}

/// The schedule tab's state.
#[derive(Debug, Default)]
pub struct ScheduleState {
    /// Last known-good list from the server.
    pub list: Vec<ScheduleRecord>,
    /// Draft for the "new schedule" form.
    pub new_draft: ScheduleDraft,
    /// Draft copied from the record being edited, if any.
    pub editing: Option<EditingSchedule>,
}

impl ScheduleState {
    /// Replace the cached list with a fresh server snapshot.
    pub fn apply(&mut self, list: Vec<ScheduleRecord>) {
        // An edit in progress survives a background refresh; the draft was
        // copied, not borrowed.
        self.list = list;
    }

    /// Start editing a schedule. Returns false when the id is not in the
    /// cached list.
    pub fn begin_edit(&mut self, id: DbId) -> bool {
        match self.list.iter().find(|s| s.id == id) {
            Some(record) => {
                self.editing = Some(EditingSchedule::from_record(record));
                true
            }
            None => false,
        }
    }

    /// Discard the draft without touching the server.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Reset the creation form to its defaults (done after a successful
    /// create).
    pub fn reset_new_draft(&mut self) {
        self.new_draft = ScheduleDraft::default();
    }

    /// Whether the day picker applies to a frequency (daily/weekly only).
    pub fn shows_day_picker(frequency: &str) -> bool {
        Frequency::parse(frequency).is_some_and(|f| f.honors_days())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: DbId) -> ScheduleRecord {
        ScheduleRecord {
            id,
            kind: "vehicles".to_string(),
            frequency: "12h".to_string(),
            active: true,
            is_full_import: false,
            start_time: Some("02:00".to_string()),
            days: vec!["monday".to_string()],
            last_run: None,
            next_run: None,
        }
    }

    #[test]
    fn begin_edit_copies_the_record() {
        let mut state = ScheduleState::default();
        state.apply(vec![record(7)]);

        assert!(state.begin_edit(7));
        let editing = state.editing.as_ref().unwrap();
        assert_eq!(editing.id, 7);
        assert_eq!(editing.frequency, "12h");

        // Mutating the draft leaves the cached record alone.
        state.editing.as_mut().unwrap().frequency = "24h".to_string();
        assert_eq!(state.list[0].frequency, "12h");
    }

    #[test]
    fn cancel_edit_discards_the_draft() {
        let mut state = ScheduleState::default();
        state.apply(vec![record(7)]);
        state.begin_edit(7);

        state.cancel_edit();
        assert!(state.editing.is_none());
        assert_eq!(state.list[0].frequency, "12h");
    }

    #[test]
    fn begin_edit_unknown_id_is_refused() {
        let mut state = ScheduleState::default();
        assert!(!state.begin_edit(99));
        assert!(state.editing.is_none());
    }

    #[test]
    fn refresh_does_not_kill_an_open_draft() {
        let mut state = ScheduleState::default();
        state.apply(vec![record(7)]);
        state.begin_edit(7);

        state.apply(vec![record(7), record(8)]);
        assert!(state.editing.is_some());
        assert_eq!(state.list.len(), 2);
    }

    #[test]
    fn day_picker_only_for_daily_and_weekly() {
        assert!(ScheduleState::shows_day_picker("24h"));
        assert!(ScheduleState::shows_day_picker("7d"));
        assert!(!ScheduleState::shows_day_picker("12h"));
        assert!(!ScheduleState::shows_day_picker("1h"));
        assert!(!ScheduleState::shows_day_picker("nonsense"));
    }

    #[test]
    fn saved_draft_patches_every_edited_field() {
        let mut state = ScheduleState::default();
        state.apply(vec![record(7)]);
        state.begin_edit(7);

        let editing = state.editing.as_mut().unwrap();
        editing.frequency = "24h".to_string();
        editing.active = false;

        let patch = state.editing.as_ref().unwrap().as_patch();
        assert_eq!(patch.frequency.as_deref(), Some("24h"));
        assert_eq!(patch.active, Some(false));
        assert_eq!(patch.days.as_deref(), Some(&["monday".to_string()][..]));
    }
}
