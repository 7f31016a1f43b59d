//! Join game use case.

use std::sync::Arc;

use shardline_domain::{Location, PlayerKey, ScreenPoint};
use shardline_shared::ServerMessage;

use crate::api::connections::{ConnectionManager, SessionError};
use crate::infrastructure::ports::{RepoError, WorldDirectory};
use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::{PlayerHandle, PlayerPlacement, PlayerSession, PlayerState};
use crate::stores::PendingArrivals;

#[derive(Debug, thiserror::Error)]
pub enum JoinGameError {
    #[error("Player {0} is already connected")]
    AlreadyConnected(PlayerKey),
    #[error("No spawn point: {0}")]
    NoSpawn(#[source] RepoError),
    #[error("Start location {0} does not resolve")]
    UnknownLocation(Location),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SessionError> for JoinGameError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AlreadyConnected(key) => Self::AlreadyConnected(key),
        }
    }
}

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinedPlayer {
    pub session: Arc<PlayerSession>,
    pub placement: PlayerPlacement,
    /// True if the player arrived through a handoff from a peer
    pub transferred: bool,
    /// Who was already around the start scope
    pub occupants: ServerMessage,
}

/// Use case for a player connecting to this server.
///
/// Places the player from a pending arrival if a peer handed them over,
/// otherwise at the world's spawn point. The arrival is only claimed once the
/// session is registered, so a failed join leaves it for the next attempt.
pub struct JoinGame {
    world: Arc<dyn WorldDirectory>,
    registry: Arc<RouterRegistry>,
    connections: Arc<ConnectionManager>,
    arrivals: Arc<PendingArrivals>,
}

impl JoinGame {
    pub fn new(
        world: Arc<dyn WorldDirectory>,
        registry: Arc<RouterRegistry>,
        connections: Arc<ConnectionManager>,
        arrivals: Arc<PendingArrivals>,
    ) -> Self {
        Self {
            world,
            registry,
            connections,
            arrivals,
        }
    }

    pub async fn execute(&self, handle: PlayerHandle) -> Result<JoinedPlayer, JoinGameError> {
        let key = handle.primary_key.clone();
        if self.connections.contains(&key) {
            return Err(JoinGameError::AlreadyConnected(key));
        }

        let (state, transferred) = match self.arrivals.peek(&key).await {
            Some(account) => (
                PlayerState::new(
                    account.location,
                    ScreenPoint::new(account.x, account.y),
                    account.orientation,
                ),
                true,
            ),
            None => {
                let spawn = self.world.spawn_point().await.map_err(JoinGameError::NoSpawn)?;
                (
                    PlayerState::new(spawn.location, spawn.position, spawn.orientation),
                    false,
                )
            }
        };

        let map = self
            .world
            .resolve(state.location)
            .await?
            .ok_or(JoinGameError::UnknownLocation(state.location))?;

        let placement = state.placement();
        let session = Arc::new(PlayerSession::new(handle.clone(), state));
        self.connections.register(Arc::clone(&session))?;
        if transferred {
            self.arrivals.take(&key).await;
        }

        self.registry.router_for(&map).add(handle);
        self.registry.broadcast(
            &map.location,
            BroadcastGroup::Extended,
            &placement.entered(&key),
            Some(&key),
        );

        tracing::info!(
            primary_key = %key,
            location = %placement.location,
            transferred,
            "Player joined"
        );
        Ok(JoinedPlayer {
            occupants: self.registry.scope_occupants(&map.location, &key),
            session,
            placement,
            transferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use shardline_domain::{ConnectionId, ServerId, SyncId};
    use shardline_shared::{Occupant, TransferAccountRequest};
    use std::time::Duration;
    use tokio::sync::mpsc;

    use super::*;
    use crate::infrastructure::ports::MockWorldDirectory;
    use crate::infrastructure::world_store::InMemoryWorldDirectory;
    use crate::test_fixtures::{hall, resident, resolved, sample_world, town};

    struct Harness {
        world: Arc<InMemoryWorldDirectory>,
        registry: Arc<RouterRegistry>,
        connections: Arc<ConnectionManager>,
        arrivals: Arc<PendingArrivals>,
        join: JoinGame,
    }

    fn harness() -> Harness {
        let world = Arc::new(InMemoryWorldDirectory::new(sample_world()));
        let registry = Arc::new(RouterRegistry::new());
        let connections = Arc::new(ConnectionManager::new());
        let arrivals = Arc::new(PendingArrivals::new(Duration::from_secs(60)));
        let join = JoinGame::new(
            world.clone(),
            Arc::clone(&registry),
            Arc::clone(&connections),
            Arc::clone(&arrivals),
        );
        Harness {
            world,
            registry,
            connections,
            arrivals,
            join,
        }
    }

    fn handle(key: &str) -> (PlayerHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (PlayerHandle::new(PlayerKey::new(key), ConnectionId::new(), tx), rx)
    }

    #[tokio::test]
    async fn new_player_spawns_and_is_announced() {
        let h = harness();
        let mut bob = resident(&h.registry, &*h.world, "bob", town(), ScreenPoint::new(1, 1)).await;
        let (alice, _rx) = handle("alice");

        let joined = h.join.execute(alice).await.expect("join");

        assert!(!joined.transferred);
        assert_eq!(joined.placement.location, town());
        assert_eq!(joined.placement.position, ScreenPoint::new(120, 80));
        assert_eq!(joined.placement.sync_id, SyncId::INITIAL);
        assert!(h.connections.contains(&PlayerKey::new("alice")));
        assert_eq!(h.registry.get(&town()).unwrap().size(), 2);
        assert!(matches!(
            bob.drain().as_slice(),
            [ServerMessage::PlayerEnteredScope { x: 120, y: 80, .. }]
        ));
        assert_eq!(
            joined.occupants,
            ServerMessage::ScopeOccupants {
                location: town(),
                players: vec![Occupant {
                    primary_key: PlayerKey::new("bob"),
                    location: town(),
                    x: 1,
                    y: 1,
                    orientation: 0.0,
                }],
            }
        );
    }

    #[tokio::test]
    async fn transferred_player_is_placed_from_the_arrival() {
        let h = harness();
        h.arrivals
            .insert(TransferAccountRequest {
                primary_key: PlayerKey::new("alice"),
                source_server: ServerId::new(7),
                location: hall(),
                x: 50,
                y: 60,
                orientation: 1.0,
            })
            .await;
        let (alice, _rx) = handle("alice");

        let joined = h.join.execute(alice).await.expect("join");

        assert!(joined.transferred);
        assert_eq!(joined.placement.location, hall());
        assert_eq!(joined.placement.position, ScreenPoint::new(50, 60));
        assert!(!h.arrivals.contains(&PlayerKey::new("alice")).await);
        assert!(h.registry.get(&hall()).unwrap().contains(&PlayerKey::new("alice")));
    }

    #[tokio::test]
    async fn second_connection_is_rejected_and_keeps_the_arrival() {
        let h = harness();
        let (first, _rx1) = handle("alice");
        h.join.execute(first).await.expect("first join");

        h.arrivals
            .insert(TransferAccountRequest {
                primary_key: PlayerKey::new("alice"),
                source_server: ServerId::new(7),
                location: hall(),
                x: 0,
                y: 0,
                orientation: 0.0,
            })
            .await;
        let (second, _rx2) = handle("alice");
        let err = h.join.execute(second).await.unwrap_err();

        assert!(matches!(err, JoinGameError::AlreadyConnected(key) if key.as_str() == "alice"));
        assert!(h.arrivals.contains(&PlayerKey::new("alice")).await);
        assert_eq!(h.registry.get(&town()).unwrap().size(), 1);
    }

    fn arrival_in(location: Location) -> TransferAccountRequest {
        TransferAccountRequest {
            primary_key: PlayerKey::new("alice"),
            source_server: ServerId::new(7),
            location,
            x: 5,
            y: 5,
            orientation: 0.0,
        }
    }

    #[tokio::test]
    async fn unresolvable_arrival_is_kept_for_a_later_join() {
        let h = harness();
        h.arrivals.insert(arrival_in(Location::tile_map(0, 42))).await;
        let (alice, _rx) = handle("alice");

        let err = h.join.execute(alice).await.unwrap_err();

        assert!(matches!(err, JoinGameError::UnknownLocation(_)));
        assert!(h.arrivals.contains(&PlayerKey::new("alice")).await);
        assert!(!h.connections.contains(&PlayerKey::new("alice")));
    }

    #[tokio::test]
    async fn losing_the_registration_race_keeps_the_arrival() {
        let connections = Arc::new(ConnectionManager::new());
        let arrivals = Arc::new(PendingArrivals::new(Duration::from_secs(60)));
        arrivals.insert(arrival_in(hall())).await;

        // Another connection for the same key registers while the join resolves
        let racing = Arc::clone(&connections);
        let mut world = MockWorldDirectory::new();
        world.expect_resolve().times(1).returning(move |location| {
            let (tx, _rx) = mpsc::channel(1);
            let rival = PlayerSession::new(
                PlayerHandle::new(PlayerKey::new("alice"), ConnectionId::new(), tx),
                PlayerState::new(location, ScreenPoint::ORIGIN, 0.0),
            );
            racing.register(Arc::new(rival)).expect("rival registers");
            Ok(Some(resolved(location, ScreenPoint::ORIGIN)))
        });
        let join = JoinGame::new(
            Arc::new(world),
            Arc::new(RouterRegistry::new()),
            Arc::clone(&connections),
            Arc::clone(&arrivals),
        );
        let (alice, _rx) = handle("alice");

        let err = join.execute(alice).await.unwrap_err();

        assert!(matches!(err, JoinGameError::AlreadyConnected(_)));
        assert!(arrivals.contains(&PlayerKey::new("alice")).await);
    }

    #[tokio::test]
    async fn missing_spawn_fails() {
        let mut world = MockWorldDirectory::new();
        world
            .expect_spawn_point()
            .returning(|| Err(RepoError::not_found("SpawnPoint", "world")));
        let join = JoinGame::new(
            Arc::new(world),
            Arc::new(RouterRegistry::new()),
            Arc::new(ConnectionManager::new()),
            Arc::new(PendingArrivals::new(Duration::from_secs(60))),
        );
        let (alice, _rx) = handle("alice");

        let err = join.execute(alice).await.unwrap_err();
        assert!(matches!(err, JoinGameError::NoSpawn(_)));
    }
}
