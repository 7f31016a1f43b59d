//! Shardline domain: hierarchical locations, the static exit and world graph,
//! and the per-player sequence ids carried by position updates.
//!
//! Everything here is pure data. No I/O, no async.

pub mod error;
pub mod exit;
pub mod geometry;
pub mod ids;
pub mod location;
pub mod movement;
pub mod sync_id;
pub mod validation;
pub mod world;

pub use error::DomainError;
pub use exit::{find_exit, ExitSide, MapExit};
pub use geometry::{ScreenPoint, ScreenRectangle};
pub use ids::{ConnectionId, HandoffId, PlayerKey, ServerId};
pub use location::{Location, ScopeClass};
pub use movement::MovementComposer;
pub use sync_id::{SyncId, SyncTracker};
pub use validation::{lint_world, LintFinding};
pub use world::{
    Building, InteriorMap, MapKind, MapView, Room, SpawnPoint, TileMap, TownMap, WorldData,
    WorldMap,
};
