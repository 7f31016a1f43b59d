//! Static world graph: worlds, towns, buildings, interior maps, rooms and tile maps.
//!
//! Loaded once from world data and immutable at runtime. Lookups resolve a
//! [`Location`] to the map object it names; a location that names nothing is a
//! defined miss (`None`), never a panic.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::exit::MapExit;
use crate::geometry::ScreenPoint;
use crate::ids::ServerId;
use crate::location::{Location, ScopeClass};

/// The whole world directory of a shard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    #[serde(default)]
    pub worlds: Vec<WorldMap>,
    /// Where freshly connected players are placed
    #[serde(default)]
    pub spawn: Option<SpawnPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPoint {
    pub location: Location,
    pub position: ScreenPoint,
    #[serde(default)]
    pub orientation: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMap {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub insertion_point: ScreenPoint,
    #[serde(default)]
    pub exits: Vec<MapExit>,
    #[serde(default)]
    pub towns: Vec<TownMap>,
    #[serde(default)]
    pub tile_maps: Vec<TileMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownMap {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub insertion_point: ScreenPoint,
    #[serde(default)]
    pub exits: Vec<MapExit>,
    #[serde(default)]
    pub buildings: Vec<Building>,
}

/// A building of a town. Each building is hosted by exactly one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub server_id: ServerId,
    #[serde(default)]
    pub interior_maps: Vec<InteriorMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteriorMap {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub insertion_point: ScreenPoint,
    #[serde(default)]
    pub exits: Vec<MapExit>,
    /// Ids of rooms of the same interior map reachable through a door or passage
    #[serde(default)]
    pub links: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMap {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    pub insertion_point: ScreenPoint,
    #[serde(default)]
    pub exits: Vec<MapExit>,
    /// Hosting server; `None` means every server hosts it
    #[serde(default)]
    pub server_id: Option<ServerId>,
}

/// A resolved map object, borrowed from [`WorldData`].
#[derive(Debug, Clone, Copy)]
pub enum MapKind<'a> {
    Room {
        room: &'a Room,
        building: &'a Building,
    },
    Town(&'a TownMap),
    TileMap(&'a TileMap),
    World(&'a WorldMap),
}

/// A map object together with the location that named it.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    pub location: Location,
    pub kind: MapKind<'a>,
}

impl<'a> MapView<'a> {
    pub fn class(&self) -> ScopeClass {
        match self.kind {
            MapKind::Room { .. } => ScopeClass::Room,
            MapKind::Town(_) => ScopeClass::Town,
            MapKind::TileMap(_) => ScopeClass::TileMap,
            MapKind::World(_) => ScopeClass::World,
        }
    }

    pub fn exits(&self) -> &'a [MapExit] {
        match self.kind {
            MapKind::Room { room, .. } => &room.exits,
            MapKind::Town(town) => &town.exits,
            MapKind::TileMap(tile_map) => &tile_map.exits,
            MapKind::World(world) => &world.exits,
        }
    }

    pub fn insertion_point(&self) -> ScreenPoint {
        match self.kind {
            MapKind::Room { room, .. } => room.insertion_point,
            MapKind::Town(town) => town.insertion_point,
            MapKind::TileMap(tile_map) => tile_map.insertion_point,
            MapKind::World(world) => world.insertion_point,
        }
    }

    /// Server that owns this scope, if ownership is pinned to one server.
    ///
    /// Rooms belong to their building's server. Towns and worlds are replicated
    /// on every server.
    pub fn owning_server(&self) -> Option<ServerId> {
        match self.kind {
            MapKind::Room { building, .. } => Some(building.server_id),
            MapKind::TileMap(tile_map) => tile_map.server_id,
            MapKind::Town(_) | MapKind::World(_) => None,
        }
    }

    /// Locations of the rooms linked to this one. Empty for non-room maps.
    pub fn near_scopes(&self) -> Vec<Location> {
        match self.kind {
            MapKind::Room { room, .. } => room
                .links
                .iter()
                .filter(|id| **id != room.id)
                .map(|id| self.location.with_room(*id))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self.kind {
            MapKind::Room { room, .. } => &room.name,
            MapKind::Town(town) => &town.name,
            MapKind::TileMap(tile_map) => &tile_map.name,
            MapKind::World(world) => &world.name,
        }
    }
}

impl WorldData {
    pub fn world(&self, world_id: i32) -> Option<&WorldMap> {
        self.worlds.iter().find(|w| w.id == world_id)
    }

    pub fn town(&self, location: &Location) -> Option<&TownMap> {
        self.world(location.world_id)?
            .towns
            .iter()
            .find(|t| t.id == location.town_id)
    }

    pub fn building(&self, location: &Location) -> Option<&Building> {
        self.town(location)?
            .buildings
            .iter()
            .find(|b| b.id == location.building_id)
    }

    pub fn room(&self, location: &Location) -> Option<&Room> {
        self.building(location)?
            .interior_maps
            .iter()
            .find(|m| m.id == location.interior_map_id)?
            .rooms
            .iter()
            .find(|r| r.id == location.room_id)
    }

    pub fn tile_map(&self, location: &Location) -> Option<&TileMap> {
        self.world(location.world_id)?
            .tile_maps
            .iter()
            .find(|tm| tm.id == location.tile_map_id)
    }

    /// Resolve a location to the map object it names.
    ///
    /// Building-class and invalid locations name no map.
    pub fn resolve(&self, location: &Location) -> Option<MapView<'_>> {
        let kind = match location.classify() {
            ScopeClass::Room => MapKind::Room {
                room: self.room(location)?,
                building: self.building(location)?,
            },
            ScopeClass::Town => MapKind::Town(self.town(location)?),
            ScopeClass::TileMap => MapKind::TileMap(self.tile_map(location)?),
            ScopeClass::World => MapKind::World(self.world(location.world_id)?),
            ScopeClass::Building | ScopeClass::Invalid => return None,
        };
        Some(MapView {
            location: *location,
            kind,
        })
    }

    /// Every map of the world graph, coarsest first.
    pub fn maps(&self) -> Vec<MapView<'_>> {
        let mut maps = Vec::new();
        for world in &self.worlds {
            maps.push(MapView {
                location: Location::world(world.id),
                kind: MapKind::World(world),
            });
            for tile_map in &world.tile_maps {
                maps.push(MapView {
                    location: Location::tile_map(world.id, tile_map.id),
                    kind: MapKind::TileMap(tile_map),
                });
            }
            for town in &world.towns {
                maps.push(MapView {
                    location: Location::town(world.id, town.id),
                    kind: MapKind::Town(town),
                });
                for building in &town.buildings {
                    for interior in &building.interior_maps {
                        for room in &interior.rooms {
                            maps.push(MapView {
                                location: Location::room(
                                    world.id,
                                    town.id,
                                    building.id,
                                    interior.id,
                                    room.id,
                                ),
                                kind: MapKind::Room { room, building },
                            });
                        }
                    }
                }
            }
        }
        maps
    }

    /// The spawn point for new players, checked against the world graph.
    pub fn spawn_point(&self) -> Result<SpawnPoint, DomainError> {
        let spawn = self
            .spawn
            .ok_or_else(|| DomainError::not_found("SpawnPoint", "world data"))?;
        if self.resolve(&spawn.location).is_none() {
            return Err(DomainError::validation(format!(
                "spawn location does not resolve: {}",
                spawn.location
            )));
        }
        Ok(spawn)
    }
}
