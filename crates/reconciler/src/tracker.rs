//! Confirmation tracking
//!
//! Each confirmation-polling phase owns one [`ConfirmationTracker`]. An
//! entry exists from the first unconfirmed observation of a mission until
//! the mission confirms or the tracker gives up on it, so the entry's
//! lifetime is exactly the window between submission and resolution.
//!
//! Trackers are plain values. Phases stage changes on a clone and only
//! commit the clone once the store has accepted the resulting writes.

use crate::table::KeyedTable;
use stakeline_core::{Mission, MissionId};

/// Bookkeeping for one unresolved mission
#[derive(Debug, Clone)]
pub struct TrackerEntry {
    /// Mission as last observed
    pub snapshot: Mission,
    /// Consecutive confirmation misses
    pub misses: u32,
}

/// Result of recording a confirmation miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissOutcome {
    /// Still within the retry bound
    Waiting { misses: u32 },
    /// Retry bound reached; the entry has been cleared
    GaveUp { misses: u32 },
}

/// Consecutive-miss counters for one phase
#[derive(Debug, Clone)]
pub struct ConfirmationTracker {
    bound: u32,
    entries: KeyedTable<MissionId, TrackerEntry>,
}

impl ConfirmationTracker {
    /// Create a tracker that gives up on the `bound`-th consecutive miss
    pub fn new(bound: u32) -> Self {
        Self {
            bound: bound.max(1),
            entries: KeyedTable::new(),
        }
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Record that `mission` is still unconfirmed
    pub fn observe_miss(&mut self, mission: &Mission) -> MissOutcome {
        let misses = self
            .entries
            .get(&mission.id)
            .map_or(1, |entry| entry.misses + 1);

        if misses >= self.bound {
            self.entries.remove(&mission.id);
            return MissOutcome::GaveUp { misses };
        }

        self.entries.insert_or_replace(
            mission.id.clone(),
            TrackerEntry {
                snapshot: mission.clone(),
                misses,
            },
        );
        MissOutcome::Waiting { misses }
    }

    /// Record that a mission confirmed, clearing its entry
    pub fn observe_confirm(&mut self, id: &MissionId) -> Option<TrackerEntry> {
        self.entries.remove(id)
    }

    /// Drop a mission's entry without resolving it
    pub fn evict(&mut self, id: &MissionId) -> Option<TrackerEntry> {
        self.entries.remove(id)
    }

    /// Drop entries for missions no longer in the phase's input
    pub fn retain_only(&mut self, ids: &[MissionId]) {
        self.entries.retain(|id, _| ids.contains(id));
    }

    /// Consecutive misses recorded for a mission
    pub fn misses(&self, id: &MissionId) -> u32 {
        self.entries.get(id).map_or(0, |entry| entry.misses)
    }

    pub fn entry(&self, id: &MissionId) -> Option<&TrackerEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
