//! Per-player sequence counter for location and position updates.
//!
//! The server bumps a player's [`SyncId`] on every location/position mutation
//! it announces. Consumers keep a [`SyncTracker`] and drop anything that is not
//! strictly newer than what they already applied.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic, server-authoritative sequence number. Never resets while the
/// player stays connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncId(u64);

impl SyncId {
    pub const INITIAL: SyncId = SyncId(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The successor of this id.
    pub fn next(self) -> SyncId {
        SyncId(self.0.saturating_add(1))
    }

    /// Advance in place and return the new value.
    pub fn bump(&mut self) -> SyncId {
        *self = self.next();
        *self
    }

    pub fn is_newer_than(self, other: SyncId) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side filter that discards stale updates.
#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    last_applied: Option<SyncId>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records `id` if it is newer than the last applied
    /// update. Returns false for stale or duplicate ids.
    pub fn accept(&mut self, id: SyncId) -> bool {
        match self.last_applied {
            Some(last) if !id.is_newer_than(last) => false,
            _ => {
                self.last_applied = Some(id);
                true
            }
        }
    }

    pub fn last_applied(&self) -> Option<SyncId> {
        self.last_applied
    }
}
