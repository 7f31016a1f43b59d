//! Shared fixtures for engine tests.

use std::f32::consts::PI;
use std::sync::Arc;

use shardline_domain::{
    Building, ConnectionId, InteriorMap, Location, MapExit, PlayerKey, Room, ScreenPoint,
    ScreenRectangle, ServerId, SpawnPoint, TileMap, TownMap, WorldData, WorldMap,
};
use shardline_shared::ServerMessage;
use tokio::sync::mpsc;

use crate::app::{App, Ports};
use crate::infrastructure::clock::{SystemClock, UuidIdGenerator};
use crate::infrastructure::encounter::TracingEncounterMemory;
use crate::infrastructure::ports::{GatewayPort, ResolvedMap, WorldDirectory};
use crate::infrastructure::settings::ShardSettings;
use crate::infrastructure::world_store::InMemoryWorldDirectory;
use crate::routing::RouterRegistry;
use crate::session::{PlayerHandle, PlayerSession, PlayerState};

pub const LOCAL: ServerId = ServerId::new(0);
pub const REMOTE: ServerId = ServerId::new(7);
/// Hosts the [`blight`] tile map.
pub const TILE_HOST: ServerId = ServerId::new(3);

pub fn town() -> Location {
    Location::town(0, 1)
}

pub fn hall() -> Location {
    Location::room(0, 1, 2, 0, 0)
}

pub fn library() -> Location {
    Location::room(0, 1, 2, 0, 1)
}

pub fn study() -> Location {
    Location::room(0, 1, 2, 0, 2)
}

/// Room of a building hosted by [`REMOTE`].
pub fn vault() -> Location {
    Location::room(0, 1, 3, 0, 0)
}

pub fn world() -> Location {
    Location::world(0)
}

/// Tile map hosted by [`TILE_HOST`].
pub fn blight() -> Location {
    Location::tile_map(0, 5)
}

/// Local tile map.
pub fn meadow() -> Location {
    Location::tile_map(0, 6)
}

/// Listed as an exit target of the town but absent from the graph.
pub fn missing_room() -> Location {
    Location::room(0, 1, 2, 0, 9)
}

fn exit(id: i32, target: Location, x: i32, y: i32) -> MapExit {
    MapExit::new(id, ScreenRectangle::new(300, 300, 20, 20), target, ScreenPoint::new(x, y))
}

fn room(id: i32, name: &str, insertion_point: ScreenPoint, exits: Vec<MapExit>, links: &[i32]) -> Room {
    Room {
        id,
        name: name.into(),
        insertion_point,
        exits,
        links: links.to_vec(),
    }
}

/// One world, one town with a local and a remote building, two tile maps.
pub fn sample_world() -> WorldData {
    WorldData {
        worlds: vec![WorldMap {
            id: 0,
            name: "Westlands".into(),
            insertion_point: ScreenPoint::new(400, 300),
            exits: vec![
                exit(1, town(), 200, 200),
                exit(2, blight(), 8, 8),
                exit(3, meadow(), 64, 64),
            ],
            towns: vec![TownMap {
                id: 1,
                name: "Tar Valon".into(),
                insertion_point: ScreenPoint::new(120, 80),
                exits: vec![
                    exit(1, Location::world(0), 15, 25),
                    exit(2, hall(), 60, 60),
                    exit(3, vault(), 40, 40).with_orientation(PI),
                    exit(4, missing_room(), 1, 1),
                ],
                buildings: vec![
                    Building {
                        id: 2,
                        name: "White Tower".into(),
                        server_id: LOCAL,
                        interior_maps: vec![InteriorMap {
                            id: 0,
                            name: "Ground floor".into(),
                            rooms: vec![
                                room(0, "Hall", ScreenPoint::new(10, 10), vec![exit(1, town(), 50, 50)], &[1]),
                                room(1, "Library", ScreenPoint::new(30, 30), vec![], &[0, 2]),
                                room(2, "Study", ScreenPoint::new(70, 70), vec![], &[1]),
                            ],
                        }],
                    },
                    Building {
                        id: 3,
                        name: "Vault House".into(),
                        server_id: REMOTE,
                        interior_maps: vec![InteriorMap {
                            id: 0,
                            name: "Cellar".into(),
                            rooms: vec![room(0, "Vault", ScreenPoint::new(40, 40), vec![exit(1, town(), 330, 330)], &[])],
                        }],
                    },
                ],
            }],
            tile_maps: vec![
                TileMap {
                    id: 5,
                    name: "Blight".into(),
                    insertion_point: ScreenPoint::new(5, 5),
                    exits: vec![exit(1, Location::world(0), 100, 100)],
                    server_id: Some(TILE_HOST),
                },
                TileMap {
                    id: 6,
                    name: "Meadow".into(),
                    insertion_point: ScreenPoint::new(64, 64),
                    exits: vec![exit(1, Location::world(0), 100, 100)],
                    server_id: None,
                },
            ],
        }],
        spawn: Some(SpawnPoint {
            location: town(),
            position: ScreenPoint::new(120, 80),
            orientation: 0.0,
        }),
    }
}

/// A bare resolved map with no exits.
pub fn resolved(location: Location, insertion_point: ScreenPoint) -> ResolvedMap {
    ResolvedMap {
        location,
        class: location.classify(),
        name: location.to_string(),
        exits: vec![],
        insertion_point,
        owning_server: None,
        near_scopes: vec![],
    }
}

/// A joined player and the receiving end of their connection.
pub struct TestPlayer {
    pub session: Arc<PlayerSession>,
    pub rx: mpsc::Receiver<ServerMessage>,
}

impl TestPlayer {
    pub fn key(&self) -> PlayerKey {
        self.session.primary_key().clone()
    }

    /// Everything queued for this player so far.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Create a player at `location` and add them to its router.
pub async fn resident(
    registry: &RouterRegistry,
    world: &dyn WorldDirectory,
    key: &str,
    location: Location,
    position: ScreenPoint,
) -> TestPlayer {
    let (tx, rx) = mpsc::channel(32);
    let handle = PlayerHandle::new(PlayerKey::new(key), ConnectionId::new(), tx);
    let map = world
        .resolve(location)
        .await
        .expect("resolve")
        .unwrap_or_else(|| resolved(location, ScreenPoint::ORIGIN));
    registry.router_for(&map).add(handle.clone());
    let session = Arc::new(PlayerSession::new(
        handle,
        PlayerState::new(location, position, 0.0),
    ));
    TestPlayer { session, rx }
}

/// A full application on [`LOCAL`] over [`sample_world`].
pub fn sample_app(gateway: Arc<dyn GatewayPort>) -> Arc<App> {
    let settings = ShardSettings {
        server_id: LOCAL,
        ..ShardSettings::default()
    };
    Arc::new(App::new(
        settings,
        Ports {
            world: Arc::new(InMemoryWorldDirectory::new(sample_world())),
            gateway,
            encounters: Arc::new(TracingEncounterMemory),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
        },
    ))
}
