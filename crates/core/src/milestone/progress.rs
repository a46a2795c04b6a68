//! Ephemeral progress cache.
//!
//! Completing a milestone pins its progress at 100. The cache remembers the
//! progress it had before, so reopening the milestone restores it instead of
//! leaving it at 100 or dropping it to zero. Entries are keyed
//! `milestone_<id>_progress`. The cache is not authoritative: losing it only
//! loses the restore.

use std::collections::HashMap;

use super::mapping::COMPLETE_PROGRESS;
use super::MilestoneStatus;
use crate::types::DbId;

/// Cache key for a milestone's remembered progress.
pub fn progress_key(id: DbId) -> String {
    format!("milestone_{id}_progress")
}

#[derive(Debug, Clone, Default)]
pub struct ProgressCache {
    entries: HashMap<String, i16>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, id: DbId, progress: i16) {
        self.entries.insert(progress_key(id), progress);
    }

    pub fn get(&self, id: DbId) -> Option<i16> {
        self.entries.get(&progress_key(id)).copied()
    }

    pub fn forget(&mut self, id: DbId) {
        self.entries.remove(&progress_key(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Work out the progress to store when a milestone moves `from` -> `to`,
    /// without touching the cache.
    ///
    /// - Pending -> Completed: store `proposed`, remember `previous`.
    /// - Completed -> Pending: restore the remembered value, else `proposed`.
    /// - Otherwise: `proposed`.
    ///
    /// The returned [`CacheUpdate`] is applied with [`ProgressCache::commit`]
    /// once the write has been persisted.
    pub fn peek_status_change(
        &self,
        id: DbId,
        from: MilestoneStatus,
        to: MilestoneStatus,
        previous: i16,
        proposed: i16,
    ) -> ProgressTransition {
        match (from, to) {
            (MilestoneStatus::Pending, MilestoneStatus::Completed) => ProgressTransition {
                progress: proposed,
                update: if previous < COMPLETE_PROGRESS {
                    CacheUpdate::Remember(previous)
                } else {
                    CacheUpdate::Keep
                },
            },
            (MilestoneStatus::Completed, MilestoneStatus::Pending) => match self.get(id) {
                Some(remembered) => ProgressTransition {
                    progress: remembered,
                    update: CacheUpdate::Release,
                },
                None => ProgressTransition::unchanged(proposed),
            },
            _ => ProgressTransition::unchanged(proposed),
        }
    }

    pub fn commit(&mut self, id: DbId, update: CacheUpdate) {
        match update {
            CacheUpdate::Keep => {}
            CacheUpdate::Remember(progress) => self.remember(id, progress),
            CacheUpdate::Release => self.forget(id),
        }
    }
}

/// Cache change that goes with a [`ProgressTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    Keep,
    Remember(i16),
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTransition {
    pub progress: i16,
    pub update: CacheUpdate,
}

impl ProgressTransition {
    fn unchanged(progress: i16) -> Self {
        Self {
            progress,
            update: CacheUpdate::Keep,
        }
    }
}
