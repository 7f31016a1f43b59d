//! Map exits - the directed connectivity graph between map scopes.
//!
//! Every map (room, town, world, tile map) owns a static list of [`MapExit`]s.
//! An exit is a trigger rectangle in the map's own coordinates plus the place
//! the player lands when crossing it.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{ScreenPoint, ScreenRectangle};
use crate::location::Location;

/// Side of the map an exit is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSide {
    /// One-way exit with no particular side
    #[default]
    None,
    North,
    South,
    West,
    East,
}

/// Distance kept between an exit's edge and the derived insertion point.
const INSERTION_MARGIN: i32 = 20;

/// A directed exit from one map to a target location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapExit {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    /// Trigger geometry in map-local coordinates
    pub bounds: ScreenRectangle,
    pub target: Location,
    /// Where the player is placed on the target map
    pub target_position: ScreenPoint,
    /// Orientation (radians) given to the player on arrival
    #[serde(default)]
    pub target_orientation: f32,
    #[serde(default)]
    pub side: ExitSide,
}

impl MapExit {
    pub fn new(id: i32, bounds: ScreenRectangle, target: Location, target_position: ScreenPoint) -> Self {
        Self {
            id,
            name: String::new(),
            bounds,
            target,
            target_position,
            target_orientation: 0.0,
            side: ExitSide::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_orientation(mut self, orientation: f32) -> Self {
        self.target_orientation = orientation;
        self
    }

    pub fn with_side(mut self, side: ExitSide) -> Self {
        self.side = side;
        self
    }

    /// A point just inside this exit, on the side the player comes from.
    pub fn insertion_point(&self) -> ScreenPoint {
        let b = &self.bounds;
        match self.side {
            ExitSide::South => ScreenPoint::new(b.x + b.width / 2, b.y - INSERTION_MARGIN),
            ExitSide::East => ScreenPoint::new(b.x - INSERTION_MARGIN, b.y + b.height / 2),
            _ => b.center(),
        }
    }

    /// Orientation of a player facing away from this exit.
    pub fn local_orientation(&self) -> f32 {
        match self.side {
            ExitSide::North => PI / 2.0,
            ExitSide::South => -PI / 2.0,
            ExitSide::East => PI,
            ExitSide::West | ExitSide::None => 0.0,
        }
    }
}

/// Find the exit leading to `target`.
///
/// Linear scan, first match wins. Several exits sharing a target are not
/// disambiguated; the world-data linter reports them.
pub fn find_exit<'a>(exits: &'a [MapExit], target: &Location) -> Option<&'a MapExit> {
    exits.iter().find(|exit| exit.target == *target)
}
