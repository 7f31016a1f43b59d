//! Per-scope membership router.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use shardline_domain::{Location, PlayerKey};
use shardline_shared::ServerMessage;

use crate::session::PlayerHandle;

/// Players currently present in one scope.
///
/// The member map is only touched under the router's own lock, and the lock is
/// never held while delivering messages.
#[derive(Debug)]
pub struct MembershipRouter {
    scope: Location,
    /// Scopes whose members also receive extended-group broadcasts
    near_scopes: Vec<Location>,
    members: Mutex<HashMap<PlayerKey, PlayerHandle>>,
}

impl MembershipRouter {
    pub fn new(scope: Location, near_scopes: Vec<Location>) -> Self {
        Self {
            scope,
            near_scopes,
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> Location {
        self.scope
    }

    pub fn near_scopes(&self) -> &[Location] {
        &self.near_scopes
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlayerKey, PlayerHandle>> {
        // Members stay consistent even if a holder panicked: every critical
        // section is a single map operation.
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a player. Returns false (and changes nothing) if already present.
    pub fn add(&self, handle: PlayerHandle) -> bool {
        let mut members = self.lock();
        if members.contains_key(&handle.primary_key) {
            tracing::debug!(
                primary_key = %handle.primary_key,
                scope = %self.scope,
                "Player already in router"
            );
            return false;
        }
        members.insert(handle.primary_key.clone(), handle);
        true
    }

    /// Remove a player, returning its handle. Absent players are a no-op.
    pub fn remove(&self, primary_key: &PlayerKey) -> Option<PlayerHandle> {
        let removed = self.lock().remove(primary_key);
        if removed.is_none() {
            tracing::debug!(primary_key = %primary_key, scope = %self.scope, "Player not in router");
        }
        removed
    }

    pub fn contains(&self, primary_key: &PlayerKey) -> bool {
        self.lock().contains_key(primary_key)
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of the current members.
    pub fn members(&self) -> Vec<PlayerHandle> {
        self.lock().values().cloned().collect()
    }

    /// Deliver `message` to every member except `excluding`.
    ///
    /// Returns how many members the message was queued for.
    pub fn broadcast(&self, message: &ServerMessage, excluding: Option<&PlayerKey>) -> usize {
        deliver(self.members(), message, excluding)
    }
}

/// Queue `message` on every handle except `excluding`, logging failed sends.
pub(crate) fn deliver(
    recipients: Vec<PlayerHandle>,
    message: &ServerMessage,
    excluding: Option<&PlayerKey>,
) -> usize {
    let mut delivered = 0;
    for handle in recipients {
        if Some(&handle.primary_key) == excluding {
            continue;
        }
        match handle.send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(primary_key = %handle.primary_key, error = %e, "Broadcast delivery failed");
            }
        }
    }
    delivered
}
