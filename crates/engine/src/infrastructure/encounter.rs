//! Encounter memory adapter.
//!
//! Introductions between players are handled by the chat layer, which is not
//! part of this shard. This adapter only records the notifications.

use shardline_domain::{Location, PlayerKey};

use crate::infrastructure::ports::EncounterMemoryPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEncounterMemory;

impl EncounterMemoryPort for TracingEncounterMemory {
    fn scope_changed(&self, primary_key: &PlayerKey, from: Location, to: Location) {
        tracing::debug!(primary_key = %primary_key, from = %from, to = %to, "Encounters reset for new scope");
    }

    fn forget(&self, primary_key: &PlayerKey) {
        tracing::debug!(primary_key = %primary_key, "Encounters forgotten");
    }
}
