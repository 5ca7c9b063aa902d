//! The per-operation busy store.
//!
//! One explicit map of operation key to pending state replaces the pile of
//! independent booleans the old panel carried. The guard is claimed
//! synchronously, before the network call is issued, which closes the
//! double-submit window; it clears when the request settles (the guard
//! drops), on success and on failure alike -- there is no timer involved.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use partsync_core::ops::OpKey;

/// Refusal returned when an operation (or a conflicting sibling) is already
/// pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRefused {
    pub blocked_by: OpKey,
}

impl std::fmt::Display for TriggerRefused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation already running: {:?}", self.blocked_by)
    }
}

impl std::error::Error for TriggerRefused {}

/// Shared store of pending operations.
#[derive(Clone, Default)]
pub struct OpStore {
    pending: Arc<Mutex<HashSet<OpKey>>>,
}

impl OpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an operation. Fails when the operation itself or any
    /// conflicting operation (same kind, other mode) is pending.
    pub fn try_begin(&self, op: OpKey) -> Result<OpGuard, TriggerRefused> {
        let mut pending = self.pending.lock().expect("op store poisoned");
        if let Some(&blocked_by) = pending.iter().find(|p| p.conflicts_with(&op)) {
            return Err(TriggerRefused { blocked_by });
        }
        pending.insert(op);
        Ok(OpGuard {
            store: Arc::clone(&self.pending),
            op,
        })
    }

    /// Whether this exact operation is pending.
    pub fn is_pending(&self, op: OpKey) -> bool {
        self.pending.lock().expect("op store poisoned").contains(&op)
    }

    /// Whether the operation should be disabled in the UI: pending itself
    /// or blocked by a conflicting sibling.
    pub fn is_blocked(&self, op: OpKey) -> bool {
        self.pending
            .lock()
            .expect("op store poisoned")
            .iter()
            .any(|p| p.conflicts_with(&op))
    }
}

/// Clears the pending flag when dropped, i.e. when the trigger settles.
#[derive(Debug)]
pub struct OpGuard {
    store: Arc<Mutex<HashSet<OpKey>>>,
    op: OpKey,
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.store.lock() {
            pending.remove(&self.op);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use partsync_core::import::{ImportKind, ImportMode};

    const VEH_INC: OpKey = OpKey::Import(ImportKind::Vehicles, ImportMode::Incremental);
    const VEH_FULL: OpKey = OpKey::Import(ImportKind::Vehicles, ImportMode::Complete);
    const PARTS_INC: OpKey = OpKey::Import(ImportKind::Parts, ImportMode::Incremental);

    #[test]
    fn begin_marks_pending_and_drop_clears() {
        let store = OpStore::new();

        let guard = store.try_begin(VEH_INC).unwrap();
        assert!(store.is_pending(VEH_INC));

        drop(guard);
        assert!(!store.is_pending(VEH_INC));
    }

    #[test]
    fn sibling_mode_is_blocked_while_pending() {
        let store = OpStore::new();
        let _guard = store.try_begin(VEH_INC).unwrap();

        // The same kind's other mode must refuse.
        let refused = store.try_begin(VEH_FULL).unwrap_err();
        assert_eq!(refused.blocked_by, VEH_INC);
        assert!(store.is_blocked(VEH_FULL));
        assert!(!store.is_pending(VEH_FULL));

        // A different kind is independent.
        assert!(store.try_begin(PARTS_INC).is_ok());
    }

    #[test]
    fn double_begin_of_same_op_refused() {
        let store = OpStore::new();
        let _guard = store.try_begin(VEH_INC).unwrap();
        assert!(store.try_begin(VEH_INC).is_err());
    }

    #[test]
    fn flag_clears_after_refusal_owner_drops() {
        let store = OpStore::new();
        let guard = store.try_begin(VEH_INC).unwrap();
        assert!(store.try_begin(VEH_FULL).is_err());
        drop(guard);
        assert!(store.try_begin(VEH_FULL).is_ok());
    }
}
