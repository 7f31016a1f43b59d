//! Per-player session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use shardline_domain::{ConnectionId, Location, MovementComposer, PlayerKey, ScreenPoint, SyncId};
use shardline_shared::ServerMessage;
use tokio::sync::{mpsc, Mutex};

use crate::infrastructure::ports::ConnectionError;

/// Outbound side of a player connection, as held by membership routers.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub primary_key: PlayerKey,
    pub connection_id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
    /// Last position published by the owning session, shared by every clone
    presence: Arc<std::sync::Mutex<Presence>>,
}

/// Position of a player as seen by others in the same scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presence {
    pub position: ScreenPoint,
    pub orientation: f32,
}

impl PlayerHandle {
    pub fn new(
        primary_key: PlayerKey,
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            primary_key,
            connection_id,
            sender,
            presence: Arc::new(std::sync::Mutex::new(Presence {
                position: ScreenPoint::ORIGIN,
                orientation: 0.0,
            })),
        }
    }

    pub fn presence(&self) -> Presence {
        *self.presence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_presence(&self, presence: Presence) {
        *self.presence.lock().unwrap_or_else(PoisonError::into_inner) = presence;
    }

    /// Queue a message without waiting. A full queue drops the message.
    pub fn send(&self, message: ServerMessage) -> Result<(), ConnectionError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ConnectionError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => ConnectionError::ChannelClosed,
        })
    }
}

/// Location and position of a player, without sequencing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub location: Location,
    pub position: ScreenPoint,
    pub orientation: f32,
}

/// Where a player is, as announced to them with a sync id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPlacement {
    pub location: Location,
    pub position: ScreenPoint,
    pub orientation: f32,
    pub sync_id: SyncId,
}

impl PlayerPlacement {
    pub fn welcome(&self, primary_key: &PlayerKey) -> ServerMessage {
        ServerMessage::Welcome {
            primary_key: primary_key.clone(),
            location: self.location,
            x: self.position.x,
            y: self.position.y,
            orientation: self.orientation,
            sync_id: self.sync_id,
        }
    }

    pub fn commit_ack(&self, primary_key: &PlayerKey) -> ServerMessage {
        ServerMessage::YouCanLeaveMap {
            primary_key: primary_key.clone(),
            location: self.location,
            x: self.position.x,
            y: self.position.y,
            orientation: self.orientation,
            sync_id: self.sync_id,
        }
    }

    pub fn reset(&self, primary_key: &PlayerKey) -> ServerMessage {
        ServerMessage::ResetPosition {
            primary_key: primary_key.clone(),
            location: self.location,
            x: self.position.x,
            y: self.position.y,
            orientation: self.orientation,
            sync_id: self.sync_id,
        }
    }

    /// Broadcast form, sent to the other members of the scope.
    pub fn entered(&self, primary_key: &PlayerKey) -> ServerMessage {
        ServerMessage::PlayerEnteredScope {
            primary_key: primary_key.clone(),
            location: self.location,
            x: self.position.x,
            y: self.position.y,
            orientation: self.orientation,
        }
    }
}

/// Mutable state of a connected player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub location: Location,
    pub position: ScreenPoint,
    pub orientation: f32,
    pub sync_id: SyncId,
    pub composer: MovementComposer,
}

impl PlayerState {
    pub fn new(location: Location, position: ScreenPoint, orientation: f32) -> Self {
        Self {
            location,
            position,
            orientation,
            sync_id: SyncId::INITIAL,
            composer: MovementComposer::new(),
        }
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            location: self.location,
            position: self.position,
            orientation: self.orientation,
        }
    }

    pub fn restore(&mut self, snapshot: PositionSnapshot) {
        self.location = snapshot.location;
        self.position = snapshot.position;
        self.orientation = snapshot.orientation;
    }

    /// Move to a new place. Does not touch the sync id.
    pub fn place(&mut self, location: Location, position: ScreenPoint, orientation: f32) {
        self.location = location;
        self.position = position;
        self.orientation = orientation;
        self.composer.reset();
    }

    pub fn presence(&self) -> Presence {
        Presence {
            position: self.position,
            orientation: self.orientation,
        }
    }

    pub fn placement(&self) -> PlayerPlacement {
        PlayerPlacement {
            location: self.location,
            position: self.position,
            orientation: self.orientation,
            sync_id: self.sync_id,
        }
    }
}

/// A connected player: outbound handle, state and the pending-transition flag.
#[derive(Debug)]
pub struct PlayerSession {
    handle: PlayerHandle,
    pending: AtomicBool,
    pub state: Mutex<PlayerState>,
}

impl PlayerSession {
    pub fn new(handle: PlayerHandle, state: PlayerState) -> Self {
        handle.set_presence(state.presence());
        Self {
            handle,
            pending: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    pub fn primary_key(&self) -> &PlayerKey {
        &self.handle.primary_key
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.handle.connection_id
    }

    pub fn handle(&self) -> &PlayerHandle {
        &self.handle
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), ConnectionError> {
        self.handle.send(message)
    }

    /// Make the state's position visible to players listing this scope.
    pub fn publish(&self, state: &PlayerState) {
        self.handle.set_presence(state.presence());
    }

    /// Mark a transition as pending. `None` if one already is.
    pub fn try_begin_transition(&self) -> Option<TransitionGuard<'_>> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TransitionGuard { session: self })
    }

    pub fn transition_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Clears the pending-transition flag when dropped.
#[derive(Debug)]
pub struct TransitionGuard<'a> {
    session: &'a PlayerSession,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.session.pending.store(false, Ordering::Release);
    }
}
