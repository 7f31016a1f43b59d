//! Connection management for WebSocket clients.
//!
//! Tracks the session of every joined player, keyed by primary key.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shardline_domain::{ConnectionId, PlayerKey};

use crate::session::PlayerSession;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Player {0} is already connected")]
    AlreadyConnected(PlayerKey),
}

/// Manages all joined player sessions.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    sessions: DashMap<PlayerKey, Arc<PlayerSession>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a joined session. One session per primary key.
    pub fn register(&self, session: Arc<PlayerSession>) -> Result<(), SessionError> {
        match self.sessions.entry(session.primary_key().clone()) {
            Entry::Occupied(entry) => Err(SessionError::AlreadyConnected(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    primary_key = %session.primary_key(),
                    connection_id = %session.connection_id(),
                    "Session registered"
                );
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Unregister the session of `primary_key` if it belongs to `connection_id`.
    pub fn unregister(
        &self,
        primary_key: &PlayerKey,
        connection_id: ConnectionId,
    ) -> Option<Arc<PlayerSession>> {
        let removed = self
            .sessions
            .remove_if(primary_key, |_, session| session.connection_id() == connection_id)
            .map(|(_, session)| session);
        if removed.is_some() {
            tracing::debug!(primary_key = %primary_key, connection_id = %connection_id, "Session unregistered");
        }
        removed
    }

    pub fn get(&self, primary_key: &PlayerKey) -> Option<Arc<PlayerSession>> {
        self.sessions.get(primary_key).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, primary_key: &PlayerKey) -> bool {
        self.sessions.contains_key(primary_key)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

/// Shared connection manager handle.
pub type SharedConnectionManager = Arc<ConnectionManager>;

#[cfg(test)]
mod tests {
    use shardline_domain::{Location, ScreenPoint};
    use tokio::sync::mpsc;

    use super::*;
    use crate::session::{PlayerHandle, PlayerState};

    fn session(key: &str) -> Arc<PlayerSession> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(PlayerSession::new(
            PlayerHandle::new(PlayerKey::new(key), ConnectionId::new(), tx),
            PlayerState::new(Location::town(0, 1), ScreenPoint::ORIGIN, 0.0),
        ))
    }

    #[test]
    fn second_session_for_a_key_is_rejected() {
        let manager = ConnectionManager::new();
        manager.register(session("alice")).expect("first");

        let err = manager.register(session("alice")).unwrap_err();
        assert_eq!(err, SessionError::AlreadyConnected(PlayerKey::new("alice")));
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn unregister_requires_matching_connection() {
        let manager = ConnectionManager::new();
        let alice = session("alice");
        manager.register(Arc::clone(&alice)).expect("register");

        assert!(manager
            .unregister(&PlayerKey::new("alice"), ConnectionId::new())
            .is_none());
        assert!(manager.contains(&PlayerKey::new("alice")));

        assert!(manager
            .unregister(&PlayerKey::new("alice"), alice.connection_id())
            .is_some());
        assert!(manager.get(&PlayerKey::new("alice")).is_none());
    }
}
