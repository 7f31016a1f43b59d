//! Leave map use case.
//!
//! Validates a "can I leave this map" request against the exit graph, then
//! commits the move locally or hands the player to the owning server. Every
//! rejection is recovered locally: the player is reset within their unchanged
//! location.

use std::sync::Arc;

use shardline_domain::{find_exit, Location, MapExit, PlayerKey, ScopeClass, ServerId};
use shardline_shared::{LeaveMapRequest, ServerMessage};

use super::insertion_point::InsertionPointResolver;
use super::remote_handoff::{HandoffRecord, HandoffStatus, HandoffTarget, RemoteHandoff};
use crate::infrastructure::ports::{EncounterMemoryPort, RepoError, ResolvedMap, WorldDirectory};
use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::{PlayerPlacement, PlayerSession, PlayerState};

/// Broad class of a transition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or conflicting request
    Protocol,
    /// The world graph is broken; a server bug
    DataIntegrity,
    /// Target not reachable from the current map
    Reachability,
    /// The owning server did not take the player
    Handoff,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeaveMapError {
    #[error("Request key {claimed} does not match session key {session}")]
    KeyMismatch { session: PlayerKey, claimed: PlayerKey },
    #[error("A transition is already pending")]
    TransitionPending,
    #[error("Request leaves a {claimed} map but the player is in a {actual} map")]
    OriginMismatch {
        claimed: ScopeClass,
        actual: ScopeClass,
    },
    #[error("Current map {0} does not resolve")]
    CurrentMapMissing(Location),
    #[error("No exit from {from} to {target}")]
    NoExit { from: Location, target: Location },
    #[error("Target map {0} does not exist")]
    TargetMissing(Location),
    #[error("World directory error: {0}")]
    Repo(String),
    #[error("Handoff to server {server} failed: {reason}")]
    HandoffFailed { server: ServerId, reason: String },
}

impl LeaveMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyMismatch { .. } | Self::TransitionPending | Self::OriginMismatch { .. } => {
                ErrorKind::Protocol
            }
            Self::CurrentMapMissing(_) | Self::Repo(_) => ErrorKind::DataIntegrity,
            Self::NoExit { .. } | Self::TargetMissing(_) => ErrorKind::Reachability,
            Self::HandoffFailed { .. } => ErrorKind::Handoff,
        }
    }
}

impl From<RepoError> for LeaveMapError {
    fn from(e: RepoError) -> Self {
        Self::Repo(e.to_string())
    }
}

/// Terminal state of one leave request.
#[derive(Debug, Clone)]
pub enum LeaveMapOutcome {
    /// Moved locally; `occupants` lists who was already there
    Committed {
        placement: PlayerPlacement,
        occupants: ServerMessage,
    },
    /// Now owned by another server; the local session is done
    Redirected {
        server_id: ServerId,
        record: HandoffRecord,
    },
    /// Handoff failed; position restored, still a local resident
    HandoffFailed {
        error: LeaveMapError,
        placement: PlayerPlacement,
    },
    /// Rejected; reset within the unchanged location
    Reset {
        error: LeaveMapError,
        placement: PlayerPlacement,
    },
    /// Dropped before admission; nothing changed and nothing is sent
    Ignored(LeaveMapError),
}

impl LeaveMapOutcome {
    /// Message for the requesting player, if any.
    pub fn reply(&self, primary_key: &PlayerKey) -> Option<ServerMessage> {
        match self {
            Self::Committed { placement, .. } => Some(placement.commit_ack(primary_key)),
            Self::Redirected { server_id, .. } => Some(ServerMessage::RedirectConnection {
                primary_key: primary_key.clone(),
                server_id: *server_id,
            }),
            Self::HandoffFailed { error, .. } => Some(ServerMessage::RedirectError {
                message: error.to_string(),
            }),
            Self::Reset { placement, .. } => Some(placement.reset(primary_key)),
            Self::Ignored(_) => None,
        }
    }

    /// Every message for the requesting player, in sending order.
    pub fn replies(&self, primary_key: &PlayerKey) -> Vec<ServerMessage> {
        let mut replies: Vec<_> = self.reply(primary_key).into_iter().collect();
        if let Self::Committed { occupants, .. } = self {
            replies.push(occupants.clone());
        }
        replies
    }

    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Redirected { .. })
    }
}

/// A request that passed validation.
struct ValidatedMove {
    exit: MapExit,
    target: ResolvedMap,
}

/// Leave map use case.
///
/// Orchestrates: admission, origin check, exit lookup, target resolution,
/// then local commit or remote handoff.
pub struct LeaveMap {
    world: Arc<dyn WorldDirectory>,
    registry: Arc<RouterRegistry>,
    resolver: Arc<InsertionPointResolver>,
    handoff: Arc<RemoteHandoff>,
    encounters: Arc<dyn EncounterMemoryPort>,
    local_server: ServerId,
}

impl LeaveMap {
    pub fn new(
        world: Arc<dyn WorldDirectory>,
        registry: Arc<RouterRegistry>,
        resolver: Arc<InsertionPointResolver>,
        handoff: Arc<RemoteHandoff>,
        encounters: Arc<dyn EncounterMemoryPort>,
        local_server: ServerId,
    ) -> Self {
        Self {
            world,
            registry,
            resolver,
            handoff,
            encounters,
            local_server,
        }
    }

    /// Execute a leave request for a map of class `origin`.
    ///
    /// Always reaches a terminal outcome; failures are carried in the outcome.
    pub async fn execute(
        &self,
        session: &PlayerSession,
        origin: ScopeClass,
        request: &LeaveMapRequest,
    ) -> LeaveMapOutcome {
        let key = session.primary_key();

        // 1. Admission
        if request.primary_key != *key {
            let error = LeaveMapError::KeyMismatch {
                session: key.clone(),
                claimed: request.primary_key.clone(),
            };
            tracing::warn!(primary_key = %key, error = %error, "Leave request dropped");
            return LeaveMapOutcome::Ignored(error);
        }
        let Some(_guard) = session.try_begin_transition() else {
            tracing::warn!(primary_key = %key, "Leave request dropped, transition already pending");
            return LeaveMapOutcome::Ignored(LeaveMapError::TransitionPending);
        };

        let mut state = session.state.lock().await;

        // 2-4. Origin, exit and target
        let validated = match self.validate(&state, origin, request.location).await {
            Ok(validated) => validated,
            Err(error) => return self.reject(session, &mut state, error).await,
        };

        if request.x != validated.exit.target_position.x
            || request.y != validated.exit.target_position.y
        {
            tracing::debug!(
                primary_key = %key,
                proposed_x = request.x,
                proposed_y = request.y,
                "Client position differs from exit target, using exit"
            );
        }

        // 5. Local or remote
        match validated.target.remote_owner(self.local_server) {
            Some(server) => self.hand_off(key, &mut state, validated, server).await,
            None => self.commit_local(session, &mut state, validated),
        }
    }

    async fn validate(
        &self,
        state: &PlayerState,
        origin: ScopeClass,
        target: Location,
    ) -> Result<ValidatedMove, LeaveMapError> {
        let actual = state.location.classify();
        if actual != origin {
            return Err(LeaveMapError::OriginMismatch {
                claimed: origin,
                actual,
            });
        }

        let current = self
            .world
            .resolve(state.location)
            .await?
            .ok_or(LeaveMapError::CurrentMapMissing(state.location))?;

        let exit = find_exit(&current.exits, &target)
            .cloned()
            .ok_or(LeaveMapError::NoExit {
                from: state.location,
                target,
            })?;

        let target = self
            .world
            .resolve(target)
            .await?
            .ok_or(LeaveMapError::TargetMissing(target))?;

        Ok(ValidatedMove { exit, target })
    }

    async fn reject(
        &self,
        session: &PlayerSession,
        state: &mut PlayerState,
        error: LeaveMapError,
    ) -> LeaveMapOutcome {
        let key = session.primary_key();
        match error.kind() {
            ErrorKind::DataIntegrity => {
                tracing::error!(primary_key = %key, location = %state.location, error = %error, "Leave request hit broken world data");
            }
            _ => {
                tracing::warn!(primary_key = %key, location = %state.location, error = %error, "Leave request rejected");
            }
        }
        let placement = self.resolver.reset(state).await;
        session.publish(state);
        LeaveMapOutcome::Reset { error, placement }
    }

    fn commit_local(
        &self,
        session: &PlayerSession,
        state: &mut PlayerState,
        validated: ValidatedMove,
    ) -> LeaveMapOutcome {
        let key = session.primary_key();
        let ValidatedMove { exit, target } = validated;
        let origin = state.location;

        self.registry.remove_player(&origin, key);

        state.place(target.location, exit.target_position, exit.target_orientation);
        state.sync_id.bump();
        session.publish(state);

        self.encounters.scope_changed(key, origin, target.location);

        self.registry.router_for(&target).add(session.handle().clone());

        let left = ServerMessage::PlayerLeftScope {
            primary_key: key.clone(),
            location: origin,
        };
        self.registry
            .broadcast(&origin, BroadcastGroup::Extended, &left, Some(key));

        let placement = state.placement();
        self.registry.broadcast(
            &target.location,
            BroadcastGroup::Extended,
            &placement.entered(key),
            Some(key),
        );

        tracing::info!(
            primary_key = %key,
            from = %origin,
            to = %target.location,
            sync_id = %placement.sync_id,
            "Transition committed"
        );
        LeaveMapOutcome::Committed {
            placement,
            occupants: self.registry.scope_occupants(&target.location, key),
        }
    }

    async fn hand_off(
        &self,
        key: &PlayerKey,
        state: &mut PlayerState,
        validated: ValidatedMove,
        server: ServerId,
    ) -> LeaveMapOutcome {
        let target = HandoffTarget {
            location: validated.target.location,
            position: validated.exit.target_position,
            orientation: validated.exit.target_orientation,
            server,
        };

        let record = self.handoff.execute(key, state, target).await;
        match record.status.clone() {
            HandoffStatus::Succeeded => LeaveMapOutcome::Redirected {
                server_id: server,
                record,
            },
            HandoffStatus::Failed(reason) => LeaveMapOutcome::HandoffFailed {
                error: LeaveMapError::HandoffFailed { server, reason },
                placement: state.placement(),
            },
            HandoffStatus::Pending => LeaveMapOutcome::HandoffFailed {
                error: LeaveMapError::HandoffFailed {
                    server,
                    reason: "handoff did not complete".to_string(),
                },
                placement: state.placement(),
            },
        }
    }
}
