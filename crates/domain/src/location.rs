//! Hierarchical location addressing.
//!
//! A [`Location`] names the scope a player currently stands in. Five ordered
//! fields (world, town, building, interior map, room) describe the
//! town/building hierarchy; the tile-map field is an independent axis used only
//! by tile-map scopes. Unset fields hold [`Location::UNSET`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rank of a location, derived from which of its fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeClass {
    /// A room inside an interior map of a building (finest scope)
    Room,
    /// A building of a town whose interior map or room is not set
    Building,
    /// A town map
    Town,
    /// A tile map (flat or isometric) attached to a world
    TileMap,
    /// An open world map (coarsest scope)
    World,
    /// No usable field is set
    Invalid,
}

impl fmt::Display for ScopeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeClass::Room => "room",
            ScopeClass::Building => "building",
            ScopeClass::Town => "town",
            ScopeClass::TileMap => "tile map",
            ScopeClass::World => "world",
            ScopeClass::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Hierarchical address of a map scope.
///
/// Equality and hashing are structural over all six fields, so a `Location`
/// doubles as the key of its scope's membership router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub world_id: i32,
    pub town_id: i32,
    pub building_id: i32,
    pub interior_map_id: i32,
    pub room_id: i32,
    pub tile_map_id: i32,
}

impl Location {
    /// Marker value of an unset field.
    pub const UNSET: i32 = -1;

    /// A location with every field unset.
    pub const fn invalid() -> Self {
        Self {
            world_id: Self::UNSET,
            town_id: Self::UNSET,
            building_id: Self::UNSET,
            interior_map_id: Self::UNSET,
            room_id: Self::UNSET,
            tile_map_id: Self::UNSET,
        }
    }

    pub const fn world(world_id: i32) -> Self {
        Self {
            world_id,
            ..Self::invalid()
        }
    }

    pub const fn town(world_id: i32, town_id: i32) -> Self {
        Self {
            world_id,
            town_id,
            ..Self::invalid()
        }
    }

    pub const fn building(world_id: i32, town_id: i32, building_id: i32) -> Self {
        Self {
            world_id,
            town_id,
            building_id,
            ..Self::invalid()
        }
    }

    pub const fn room(
        world_id: i32,
        town_id: i32,
        building_id: i32,
        interior_map_id: i32,
        room_id: i32,
    ) -> Self {
        Self {
            world_id,
            town_id,
            building_id,
            interior_map_id,
            room_id,
            tile_map_id: Self::UNSET,
        }
    }

    pub const fn tile_map(world_id: i32, tile_map_id: i32) -> Self {
        Self {
            world_id,
            tile_map_id,
            ..Self::invalid()
        }
    }

    /// Classify this location. Checked finest first: room, building, town,
    /// tile map, world.
    pub fn classify(&self) -> ScopeClass {
        let set = |v: i32| v >= 0;

        if !set(self.world_id) {
            return ScopeClass::Invalid;
        }
        if set(self.town_id) && set(self.building_id) {
            if set(self.interior_map_id) && set(self.room_id) {
                return ScopeClass::Room;
            }
            return ScopeClass::Building;
        }
        if set(self.town_id) {
            return ScopeClass::Town;
        }
        if set(self.tile_map_id) {
            return ScopeClass::TileMap;
        }
        ScopeClass::World
    }

    pub fn is_room(&self) -> bool {
        self.classify() == ScopeClass::Room
    }

    pub fn is_building(&self) -> bool {
        self.classify() == ScopeClass::Building
    }

    pub fn is_town(&self) -> bool {
        self.classify() == ScopeClass::Town
    }

    pub fn is_tile_map(&self) -> bool {
        self.classify() == ScopeClass::TileMap
    }

    pub fn is_world(&self) -> bool {
        self.classify() == ScopeClass::World
    }

    pub fn is_valid(&self) -> bool {
        self.classify() != ScopeClass::Invalid
    }

    /// True if both locations lie on the same interior map of the same building.
    pub fn same_interior_map(&self, other: &Location) -> bool {
        self.world_id == other.world_id
            && self.town_id == other.town_id
            && self.building_id == other.building_id
            && self.interior_map_id == other.interior_map_id
    }

    /// Copy of this location pointing at another room of the same interior map.
    pub fn with_room(&self, room_id: i32) -> Self {
        Self { room_id, ..*self }
    }

    /// The town this location belongs to, if any.
    pub fn town_of(&self) -> Option<Location> {
        (self.world_id >= 0 && self.town_id >= 0).then(|| Location::town(self.world_id, self.town_id))
    }

    /// The world this location belongs to, if any.
    pub fn world_of(&self) -> Option<Location> {
        (self.world_id >= 0).then(|| Location::world(self.world_id))
    }

    /// The tile map this location belongs to, if any.
    pub fn tile_map_of(&self) -> Option<Location> {
        (self.world_id >= 0 && self.tile_map_id >= 0)
            .then(|| Location::tile_map(self.world_id, self.tile_map_id))
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            ScopeClass::Room => write!(
                f,
                "Room: w{}, t{}, b{}, i{}, r{}",
                self.world_id, self.town_id, self.building_id, self.interior_map_id, self.room_id
            ),
            ScopeClass::Building => write!(
                f,
                "Building: w{}, t{}, b{}",
                self.world_id, self.town_id, self.building_id
            ),
            ScopeClass::Town => write!(f, "Town: w{}, t{}", self.world_id, self.town_id),
            ScopeClass::TileMap => {
                write!(f, "TileMap: w{}, tm{}", self.world_id, self.tile_map_id)
            }
            ScopeClass::World => write!(f, "World: w{}", self.world_id),
            ScopeClass::Invalid => write!(f, "Invalid location"),
        }
    }
}
