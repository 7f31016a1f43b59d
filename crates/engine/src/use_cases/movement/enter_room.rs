//! Enter room use case.
//!
//! Moves a player between linked rooms of one interior map. No exit is
//! involved; the room links decide reachability.

use std::sync::Arc;

use shardline_domain::{Location, PlayerKey, ScopeClass};
use shardline_shared::ServerMessage;

use super::insertion_point::InsertionPointResolver;
use crate::infrastructure::ports::{EncounterMemoryPort, RepoError, ResolvedMap, WorldDirectory};
use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::{PlayerPlacement, PlayerSession};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnterRoomError {
    #[error("Request key {claimed} does not match session key {session}")]
    KeyMismatch { session: PlayerKey, claimed: PlayerKey },
    #[error("A transition is already pending")]
    TransitionPending,
    #[error("Player is in a {0} map, not a room")]
    NotInRoom(ScopeClass),
    #[error("Room {target} is not linked to {from}")]
    NotLinked { from: Location, target: Location },
    #[error("Current room {0} does not resolve")]
    CurrentRoomMissing(Location),
    #[error("Room {0} does not exist")]
    TargetMissing(Location),
    #[error("World directory error: {0}")]
    Repo(String),
}

impl From<RepoError> for EnterRoomError {
    fn from(e: RepoError) -> Self {
        Self::Repo(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum EnterRoomOutcome {
    /// Now in the target room; also returned for a re-announce of the current room
    Entered {
        placement: PlayerPlacement,
        occupants: ServerMessage,
    },
    Reset {
        error: EnterRoomError,
        placement: PlayerPlacement,
    },
    Ignored(EnterRoomError),
}

impl EnterRoomOutcome {
    pub fn reply(&self, primary_key: &PlayerKey) -> Option<ServerMessage> {
        match self {
            Self::Entered { placement, .. } => Some(ServerMessage::RoomEntered {
                primary_key: primary_key.clone(),
                location: placement.location,
                sync_id: placement.sync_id,
            }),
            Self::Reset { placement, .. } => Some(placement.reset(primary_key)),
            Self::Ignored(_) => None,
        }
    }

    /// Every message for the requesting player, in sending order.
    pub fn replies(&self, primary_key: &PlayerKey) -> Vec<ServerMessage> {
        let mut replies: Vec<_> = self.reply(primary_key).into_iter().collect();
        if let Self::Entered { occupants, .. } = self {
            replies.push(occupants.clone());
        }
        replies
    }
}

pub struct EnterRoom {
    world: Arc<dyn WorldDirectory>,
    registry: Arc<RouterRegistry>,
    resolver: Arc<InsertionPointResolver>,
    encounters: Arc<dyn EncounterMemoryPort>,
}

impl EnterRoom {
    pub fn new(
        world: Arc<dyn WorldDirectory>,
        registry: Arc<RouterRegistry>,
        resolver: Arc<InsertionPointResolver>,
        encounters: Arc<dyn EncounterMemoryPort>,
    ) -> Self {
        Self {
            world,
            registry,
            resolver,
            encounters,
        }
    }

    pub async fn execute(
        &self,
        session: &PlayerSession,
        claimed_key: &PlayerKey,
        target: Location,
    ) -> EnterRoomOutcome {
        let key = session.primary_key();
        if claimed_key != key {
            let error = EnterRoomError::KeyMismatch {
                session: key.clone(),
                claimed: claimed_key.clone(),
            };
            tracing::warn!(primary_key = %key, error = %error, "Enter room request dropped");
            return EnterRoomOutcome::Ignored(error);
        }
        let Some(_guard) = session.try_begin_transition() else {
            tracing::warn!(primary_key = %key, "Enter room request dropped, transition already pending");
            return EnterRoomOutcome::Ignored(EnterRoomError::TransitionPending);
        };

        let mut state = session.state.lock().await;
        let origin = state.location;

        if origin == target && origin.is_room() {
            tracing::debug!(primary_key = %key, location = %origin, "Room re-announced");
            return EnterRoomOutcome::Entered {
                placement: state.placement(),
                occupants: self.registry.scope_occupants(&origin, key),
            };
        }

        let target_map = match self.validate(origin, target).await {
            Ok(map) => map,
            Err(error) => {
                match &error {
                    EnterRoomError::CurrentRoomMissing(_) | EnterRoomError::Repo(_) => {
                        tracing::error!(primary_key = %key, location = %origin, error = %error, "Enter room hit broken world data");
                    }
                    _ => {
                        tracing::warn!(primary_key = %key, location = %origin, error = %error, "Enter room rejected");
                    }
                }
                let placement = self.resolver.reset(&mut state).await;
                session.publish(&state);
                return EnterRoomOutcome::Reset { error, placement };
            }
        };

        self.registry.remove_player(&origin, key);
        state.location = target;
        state.composer.reset();
        state.sync_id.bump();
        self.encounters.scope_changed(key, origin, target);
        self.registry.router_for(&target_map).add(session.handle().clone());

        let changed = ServerMessage::LocationChanged {
            primary_key: key.clone(),
            from: origin,
            to: target,
        };
        self.registry
            .broadcast_many(&[origin, target], BroadcastGroup::Extended, &changed, Some(key));

        tracing::info!(primary_key = %key, from = %origin, to = %target, "Room entered");
        EnterRoomOutcome::Entered {
            placement: state.placement(),
            occupants: self.registry.scope_occupants(&target, key),
        }
    }

    async fn validate(
        &self,
        origin: Location,
        target: Location,
    ) -> Result<ResolvedMap, EnterRoomError> {
        let class = origin.classify();
        if class != ScopeClass::Room {
            return Err(EnterRoomError::NotInRoom(class));
        }
        if !target.is_room() || !origin.same_interior_map(&target) {
            return Err(EnterRoomError::NotLinked { from: origin, target });
        }

        let current = self
            .world
            .resolve(origin)
            .await?
            .ok_or(EnterRoomError::CurrentRoomMissing(origin))?;
        if !current.near_scopes.contains(&target) {
            return Err(EnterRoomError::NotLinked { from: origin, target });
        }

        self.world
            .resolve(target)
            .await?
            .ok_or(EnterRoomError::TargetMissing(target))
    }
}
