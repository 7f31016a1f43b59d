//! Leave game use case, run when a connection closes.

use std::sync::Arc;

use shardline_shared::ServerMessage;

use crate::api::connections::ConnectionManager;
use crate::infrastructure::ports::EncounterMemoryPort;
use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::PlayerSession;

pub struct LeaveGame {
    registry: Arc<RouterRegistry>,
    connections: Arc<ConnectionManager>,
    encounters: Arc<dyn EncounterMemoryPort>,
}

impl LeaveGame {
    pub fn new(
        registry: Arc<RouterRegistry>,
        connections: Arc<ConnectionManager>,
        encounters: Arc<dyn EncounterMemoryPort>,
    ) -> Self {
        Self {
            registry,
            connections,
            encounters,
        }
    }

    /// Remove the player from this server. A player already handed off is
    /// no longer in any router, so nobody is told twice.
    pub async fn execute(&self, session: &PlayerSession) {
        let key = session.primary_key();
        let location = session.state.lock().await.location;

        if self.registry.remove_player(&location, key).is_some() {
            let left = ServerMessage::PlayerLeftScope {
                primary_key: key.clone(),
                location,
            };
            self.registry
                .broadcast(&location, BroadcastGroup::Extended, &left, Some(key));
        }

        self.encounters.forget(key);
        self.connections.unregister(key, session.connection_id());
        tracing::info!(primary_key = %key, location = %location, "Player left");
    }
}

#[cfg(test)]
mod tests {
    use shardline_domain::ScreenPoint;

    use super::*;
    use crate::infrastructure::ports::MockEncounterMemoryPort;
    use crate::infrastructure::world_store::InMemoryWorldDirectory;
    use crate::test_fixtures::{hall, library, resident, sample_world, vault};

    fn leave_game(registry: Arc<RouterRegistry>, connections: Arc<ConnectionManager>) -> LeaveGame {
        let mut encounters = MockEncounterMemoryPort::new();
        encounters
            .expect_forget()
            .withf(|key| key.as_str() == "alice")
            .times(1)
            .return_const(());
        LeaveGame::new(registry, connections, Arc::new(encounters))
    }

    #[tokio::test]
    async fn disconnect_tells_the_neighbourhood() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let connections = Arc::new(ConnectionManager::new());
        let alice = resident(&registry, &world, "alice", hall(), ScreenPoint::new(1, 1)).await;
        let mut bob = resident(&registry, &world, "bob", library(), ScreenPoint::new(2, 2)).await;
        connections.register(Arc::clone(&alice.session)).expect("register");

        leave_game(Arc::clone(&registry), Arc::clone(&connections))
            .execute(&alice.session)
            .await;

        assert_eq!(registry.get(&hall()).unwrap().size(), 0);
        assert!(!connections.contains(&alice.key()));
        assert!(matches!(
            bob.drain().as_slice(),
            [ServerMessage::PlayerLeftScope { location, .. }] if *location == hall()
        ));
    }

    #[tokio::test]
    async fn handed_off_player_is_not_announced_again() {
        let world = InMemoryWorldDirectory::new(sample_world());
        let registry = Arc::new(RouterRegistry::new());
        let connections = Arc::new(ConnectionManager::new());
        let alice = resident(&registry, &world, "alice", hall(), ScreenPoint::new(1, 1)).await;
        let mut bob = resident(&registry, &world, "bob", hall(), ScreenPoint::new(2, 2)).await;

        // What a successful handoff leaves behind
        registry.remove_player(&hall(), &alice.key());
        alice.session.state.lock().await.location = vault();

        leave_game(Arc::clone(&registry), connections)
            .execute(&alice.session)
            .await;

        assert!(bob.drain().is_empty());
        assert_eq!(registry.get(&hall()).unwrap().size(), 1);
    }
}
