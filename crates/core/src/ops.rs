//! Control-surface operation keys.
//!
//! The admin console tracks the busy state of each trigger as an explicit
//! finite map keyed by [`OpKey`], replacing a pile of independent booleans.
//! The conflict rule mirrors the panel's disable logic: the two modes of one
//! kind must never be triggerable at the same time.

use serde::{Deserialize, Serialize};

use crate::import::{ImportKind, ImportMode};

/// Identity of one control-surface operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKey {
    Import(ImportKind, ImportMode),
    /// Maintenance: recompute per-vehicle part counters.
    Recount,
}

impl OpKey {
    /// All operations the panel exposes, in display order.
    pub const ALL: [OpKey; 7] = [
        OpKey::Import(ImportKind::Vehicles, ImportMode::Incremental),
        OpKey::Import(ImportKind::Vehicles, ImportMode::Complete),
        OpKey::Import(ImportKind::Parts, ImportMode::Incremental),
        OpKey::Import(ImportKind::Parts, ImportMode::Complete),
        OpKey::Import(ImportKind::All, ImportMode::Incremental),
        OpKey::Import(ImportKind::All, ImportMode::Complete),
        OpKey::Recount,
    ];

    /// Two operations conflict when running them concurrently would touch
    /// the same resource: both modes of one kind share that kind's feed,
    /// so a pending incremental import disables the complete button and
    /// vice versa. Recount only conflicts with itself.
    pub fn conflicts_with(&self, other: &OpKey) -> bool {
        match (self, other) {
            (OpKey::Import(a, _), OpKey::Import(b, _)) => a == b,
            (OpKey::Recount, OpKey::Recount) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_kind_other_mode_conflicts() {
        let inc = OpKey::Import(ImportKind::Vehicles, ImportMode::Incremental);
        let full = OpKey::Import(ImportKind::Vehicles, ImportMode::Complete);
        assert!(inc.conflicts_with(&full));
        assert!(inc.conflicts_with(&inc));
    }

    #[test]
    fn different_kinds_do_not_conflict() {
        let vehicles = OpKey::Import(ImportKind::Vehicles, ImportMode::Incremental);
        let parts = OpKey::Import(ImportKind::Parts, ImportMode::Complete);
        assert!(!vehicles.conflicts_with(&parts));
    }

    #[test]
    fn recount_is_independent_of_imports() {
        let recount = OpKey::Recount;
        let all = OpKey::Import(ImportKind::All, ImportMode::Complete);
        assert!(!recount.conflicts_with(&all));
        assert!(recount.conflicts_with(&OpKey::Recount));
    }

    #[test]
    fn panel_exposes_seven_operations() {
        assert_eq!(OpKey::ALL.len(), 7);
    }
}
