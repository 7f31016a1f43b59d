//! WebSocket message types for client-shard communication
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Renaming variants is a breaking change
//! - Unknown enum variants deserialize to `Unknown` for forward compatibility

use serde::{Deserialize, Serialize};

use shardline_domain::{Location, PlayerKey, ScopeClass, ScreenPoint, ServerId, SyncId};

/// Error codes carried by [`ServerMessage::Error`].
pub mod error_codes {
    pub const ALREADY_CONNECTED: &str = "ALREADY_CONNECTED";
    pub const NOT_JOINED: &str = "NOT_JOINED";
    pub const NO_SPAWN: &str = "NO_SPAWN";
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    pub const INVALID_PATH: &str = "INVALID_PATH";
}

// =============================================================================
// Client Messages (client → shard)
// =============================================================================

/// Payload shared by the four "can I leave this map" requests.
///
/// The variant carrying it names the class of map being left; `location` is
/// the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveMapRequest {
    pub primary_key: PlayerKey,
    /// Target location
    pub location: Location,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub orientation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// First message of a session
    JoinGame { primary_key: PlayerKey },
    CanLeaveRoom(LeaveMapRequest),
    CanLeaveTileMap(LeaveMapRequest),
    CanLeaveTown(LeaveMapRequest),
    CanLeaveWorld(LeaveMapRequest),
    /// Move to a linked room of the same interior map
    EnteringRoom {
        primary_key: PlayerKey,
        location: Location,
    },
    /// New movement path, tagged with the sync id the client last applied
    PathUpdate {
        primary_key: PlayerKey,
        sync_id: SyncId,
        path: Vec<ScreenPoint>,
        #[serde(default)]
        moving: bool,
    },
    /// Heartbeat ping
    Heartbeat,

    /// Unknown message type for forward compatibility
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// For the leave-map requests, the class of map being left and the request.
    pub fn as_leave_request(&self) -> Option<(ScopeClass, &LeaveMapRequest)> {
        match self {
            Self::CanLeaveRoom(req) => Some((ScopeClass::Room, req)),
            Self::CanLeaveTileMap(req) => Some((ScopeClass::TileMap, req)),
            Self::CanLeaveTown(req) => Some((ScopeClass::Town, req)),
            Self::CanLeaveWorld(req) => Some((ScopeClass::World, req)),
            _ => None,
        }
    }
}

// =============================================================================
// Server Messages (shard → client)
// =============================================================================

/// A player already present around a scope, as listed to a newcomer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub primary_key: PlayerKey,
    /// The occupant's own scope: the entered one or one of its near scopes
    pub location: Location,
    pub x: i32,
    pub y: i32,
    pub orientation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Join accepted; the player is placed here
    Welcome {
        primary_key: PlayerKey,
        location: Location,
        x: i32,
        y: i32,
        orientation: f32,
        sync_id: SyncId,
    },
    /// Transition committed
    YouCanLeaveMap {
        primary_key: PlayerKey,
        location: Location,
        x: i32,
        y: i32,
        orientation: f32,
        sync_id: SyncId,
    },
    /// Transition rejected; stay at this position of the unchanged location
    ResetPosition {
        primary_key: PlayerKey,
        location: Location,
        x: i32,
        y: i32,
        orientation: f32,
        sync_id: SyncId,
    },
    /// Reconnect to another server, which now owns the player
    RedirectConnection {
        primary_key: PlayerKey,
        server_id: ServerId,
    },
    /// Handoff to another server failed; the player stays put and may retry
    RedirectError { message: String },
    /// Linked room entered
    RoomEntered {
        primary_key: PlayerKey,
        location: Location,
        sync_id: SyncId,
    },
    PlayerEnteredScope {
        primary_key: PlayerKey,
        location: Location,
        x: i32,
        y: i32,
        orientation: f32,
    },
    PlayerLeftScope {
        primary_key: PlayerKey,
        location: Location,
    },
    /// Another player moved between linked rooms
    LocationChanged {
        primary_key: PlayerKey,
        from: Location,
        to: Location,
    },
    /// Another player's movement path
    PathUpdated {
        primary_key: PlayerKey,
        sync_id: SyncId,
        path: Vec<ScreenPoint>,
        moving: bool,
    },
    Error { code: String, message: String },
    /// Who is already around the scope the receiving player just arrived in
    ScopeOccupants {
        location: Location,
        players: Vec<Occupant>,
    },
    /// Heartbeat response
    Pong,

    /// Unknown message type for forward compatibility
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Sync id carried by this message, if it announces a state change of the
    /// receiving player.
    pub fn sync_id(&self) -> Option<SyncId> {
        match self {
            Self::Welcome { sync_id, .. }
            | Self::YouCanLeaveMap { sync_id, .. }
            | Self::ResetPosition { sync_id, .. }
            | Self::RoomEntered { sync_id, .. } => Some(*sync_id),
            _ => None,
        }
    }
}
