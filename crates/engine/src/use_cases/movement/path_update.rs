//! Path update use case.

use std::sync::Arc;

use shardline_domain::{PlayerKey, ScopeClass, ScreenPoint, SyncId};
use shardline_shared::ServerMessage;

use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::PlayerSession;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathUpdateError {
    #[error("Request key {claimed} does not match session key {session}")]
    KeyMismatch { session: PlayerKey, claimed: PlayerKey },
    #[error("Path tagged with sync id {received}, current is {current}")]
    Stale { current: SyncId, received: SyncId },
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// A movement path sent by a client.
#[derive(Debug, Clone)]
pub struct PathUpdateInput {
    pub primary_key: PlayerKey,
    pub sync_id: SyncId,
    pub path: Vec<ScreenPoint>,
    pub moving: bool,
}

/// Applies client movement paths and relays them to nearby players.
///
/// A path tagged with anything but the current sync id predates a transition
/// or reset and is dropped.
pub struct PathUpdate {
    registry: Arc<RouterRegistry>,
}

impl PathUpdate {
    pub fn new(registry: Arc<RouterRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the number of players the path was relayed to.
    pub async fn execute(
        &self,
        session: &PlayerSession,
        input: PathUpdateInput,
    ) -> Result<usize, PathUpdateError> {
        let key = session.primary_key();
        if input.primary_key != *key {
            return Err(PathUpdateError::KeyMismatch {
                session: key.clone(),
                claimed: input.primary_key,
            });
        }

        let mut state = session.state.lock().await;
        if input.sync_id != state.sync_id {
            tracing::debug!(
                primary_key = %key,
                current = %state.sync_id,
                received = %input.sync_id,
                "Stale path update discarded"
            );
            return Err(PathUpdateError::Stale {
                current: state.sync_id,
                received: input.sync_id,
            });
        }

        state
            .composer
            .set_path(input.path.clone(), input.moving)
            .map_err(|e| PathUpdateError::InvalidPath(e.to_string()))?;
        if let Some(destination) = state.composer.destination() {
            state.position = destination;
        }
        session.publish(&state);

        let location = state.location;
        let sync_id = state.sync_id;
        drop(state);

        match location.classify() {
            ScopeClass::Room | ScopeClass::TileMap => {
                let relayed = ServerMessage::PathUpdated {
                    primary_key: key.clone(),
                    sync_id,
                    path: input.path,
                    moving: input.moving,
                };
                Ok(self
                    .registry
                    .broadcast(&location, BroadcastGroup::Extended, &relayed, Some(key)))
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::world_store::InMemoryWorldDirectory;
    use crate::test_fixtures::{hall, library, resident, sample_world, town};

    fn input(key: &PlayerKey, sync_id: SyncId, path: Vec<ScreenPoint>) -> PathUpdateInput {
        PathUpdateInput {
            primary_key: key.clone(),
            sync_id,
            path,
            moving: true,
        }
    }

    #[tokio::test]
    async fn current_path_moves_player_and_is_relayed_to_linked_rooms() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let alice = resident(&registry, &world, "alice", hall(), ScreenPoint::new(10, 10)).await;
        let mut bob = resident(&registry, &world, "bob", library(), ScreenPoint::new(30, 30)).await;

        let path = vec![ScreenPoint::new(11, 10), ScreenPoint::new(20, 14)];
        let relayed = PathUpdate::new(Arc::clone(&registry))
            .execute(&alice.session, input(&alice.key(), SyncId::INITIAL, path.clone()))
            .await
            .expect("applied");

        assert_eq!(relayed, 1);
        assert_eq!(alice.session.state.lock().await.position, ScreenPoint::new(20, 14));
        assert_eq!(alice.session.handle().presence().position, ScreenPoint::new(20, 14));
        assert_eq!(
            bob.drain(),
            vec![ServerMessage::PathUpdated {
                primary_key: alice.key(),
                sync_id: SyncId::INITIAL,
                path,
                moving: true,
            }]
        );
    }

    #[tokio::test]
    async fn stale_sync_id_is_discarded() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let alice = resident(&registry, &world, "alice", hall(), ScreenPoint::new(10, 10)).await;
        alice.session.state.lock().await.sync_id.bump();

        let err = PathUpdate::new(registry)
            .execute(
                &alice.session,
                input(&alice.key(), SyncId::INITIAL, vec![ScreenPoint::new(99, 99)]),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PathUpdateError::Stale {
                current: SyncId::new(1),
                received: SyncId::INITIAL,
            }
        );
        assert_eq!(alice.session.state.lock().await.position, ScreenPoint::new(10, 10));
    }

    #[tokio::test]
    async fn towns_do_not_relay() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let alice = resident(&registry, &world, "alice", town(), ScreenPoint::new(1, 1)).await;
        let mut bob = resident(&registry, &world, "bob", town(), ScreenPoint::new(2, 2)).await;

        let relayed = PathUpdate::new(registry)
            .execute(&alice.session, input(&alice.key(), SyncId::INITIAL, vec![ScreenPoint::new(5, 5)]))
            .await
            .expect("applied");

        assert_eq!(relayed, 0);
        assert!(bob.drain().is_empty());
        assert_eq!(alice.session.state.lock().await.position, ScreenPoint::new(5, 5));
    }

    #[tokio::test]
    async fn empty_path_is_invalid() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let alice = resident(&registry, &world, "alice", hall(), ScreenPoint::new(1, 1)).await;

        let err = PathUpdate::new(registry)
            .execute(&alice.session, input(&alice.key(), SyncId::INITIAL, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, PathUpdateError::InvalidPath(_)));
    }
}
