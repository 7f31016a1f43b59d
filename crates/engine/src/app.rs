//! Application state and composition.

use std::sync::Arc;

use crate::api::connections::ConnectionManager;
use crate::infrastructure::ports::{
    ClockPort, EncounterMemoryPort, GatewayPort, IdGenerator, WorldDirectory,
};
use crate::infrastructure::settings::ShardSettings;
use crate::routing::RouterRegistry;
use crate::stores::PendingArrivals;
use crate::use_cases::movement::{
    EnterRoom, InsertionPointResolver, LeaveMap, PathUpdate, RemoteHandoff,
};
use crate::use_cases::session::{JoinGame, LeaveGame};
use crate::use_cases::{MovementUseCases, SessionUseCases};

/// External collaborators of the shard.
pub struct Ports {
    pub world: Arc<dyn WorldDirectory>,
    pub gateway: Arc<dyn GatewayPort>,
    pub encounters: Arc<dyn EncounterMemoryPort>,
    pub clock: Arc<dyn ClockPort>,
    pub ids: Arc<dyn IdGenerator>,
}

/// Main application state.
///
/// Passed to HTTP/WebSocket handlers via Axum state.
pub struct App {
    pub settings: ShardSettings,
    pub world: Arc<dyn WorldDirectory>,
    pub registry: Arc<RouterRegistry>,
    pub connections: Arc<ConnectionManager>,
    pub arrivals: Arc<PendingArrivals>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub movement: MovementUseCases,
    pub session: SessionUseCases,
}

impl App {
    pub fn new(settings: ShardSettings, ports: Ports) -> Self {
        let Ports {
            world,
            gateway,
            encounters,
            clock,
            ids,
        } = ports;

        let registry = Arc::new(RouterRegistry::new());
        let connections = Arc::new(ConnectionManager::new());
        let arrivals = Arc::new(PendingArrivals::new(settings.pending_arrival_ttl));

        let resolver = Arc::new(InsertionPointResolver::new(world.clone()));
        let handoff = Arc::new(RemoteHandoff::new(
            gateway,
            registry.clone(),
            clock,
            ids,
            settings.server_id,
            settings.handoff_timeout,
        ));

        let leave_map = Arc::new(LeaveMap::new(
            world.clone(),
            registry.clone(),
            resolver.clone(),
            handoff,
            encounters.clone(),
            settings.server_id,
        ));
        let enter_room = Arc::new(EnterRoom::new(
            world.clone(),
            registry.clone(),
            resolver,
            encounters.clone(),
        ));
        let path_update = Arc::new(PathUpdate::new(registry.clone()));
        let movement = MovementUseCases::new(leave_map, enter_room, path_update);

        let join_game = Arc::new(JoinGame::new(
            world.clone(),
            registry.clone(),
            connections.clone(),
            arrivals.clone(),
        ));
        let leave_game = Arc::new(LeaveGame::new(
            registry.clone(),
            connections.clone(),
            encounters,
        ));
        let session = SessionUseCases::new(join_game, leave_game);

        Self {
            settings,
            world,
            registry,
            connections,
            arrivals,
            use_cases: UseCases { movement, session },
        }
    }
}
