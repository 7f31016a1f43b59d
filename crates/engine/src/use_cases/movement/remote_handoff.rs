//! Remote handoff: hand a player over to the server owning their next scope.
//!
//! The player's position is mutated speculatively so the transfer can describe
//! it to the peer. A refused, failed or timed-out transfer restores the exact
//! pre-attempt snapshot and leaves router membership untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shardline_domain::{HandoffId, Location, PlayerKey, ScreenPoint, ServerId};
use shardline_shared::{ServerMessage, TransferAccountRequest};

use crate::infrastructure::ports::{ClockPort, GatewayError, GatewayPort, IdGenerator};
use crate::routing::{BroadcastGroup, RouterRegistry};
use crate::session::{PlayerState, PositionSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum HandoffStatus {
    Pending,
    Succeeded,
    Failed(String),
}

/// One handoff attempt. Lives only for the duration of the attempt.
#[derive(Debug, Clone)]
pub struct HandoffRecord {
    pub id: HandoffId,
    pub primary_key: PlayerKey,
    pub target_server: ServerId,
    /// State before the speculative mutation
    pub snapshot: PositionSnapshot,
    pub started_at: DateTime<Utc>,
    pub status: HandoffStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Gateway did not answer within {0:?}")]
    Timeout(Duration),
}

/// Where the player lands on the remote server.
#[derive(Debug, Clone, Copy)]
pub struct HandoffTarget {
    pub location: Location,
    pub position: ScreenPoint,
    pub orientation: f32,
    pub server: ServerId,
}

pub struct RemoteHandoff {
    gateway: Arc<dyn GatewayPort>,
    registry: Arc<RouterRegistry>,
    clock: Arc<dyn ClockPort>,
    ids: Arc<dyn IdGenerator>,
    local_server: ServerId,
    timeout: Duration,
}

impl RemoteHandoff {
    pub fn new(
        gateway: Arc<dyn GatewayPort>,
        registry: Arc<RouterRegistry>,
        clock: Arc<dyn ClockPort>,
        ids: Arc<dyn IdGenerator>,
        local_server: ServerId,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            registry,
            clock,
            ids,
            local_server,
            timeout,
        }
    }

    /// Attempt the handoff. The returned record's status is never `Pending`.
    ///
    /// On success the player has left the local router and their sync id was
    /// bumped. On failure `state` equals the snapshot in the record.
    pub async fn execute(
        &self,
        primary_key: &PlayerKey,
        state: &mut PlayerState,
        target: HandoffTarget,
    ) -> HandoffRecord {
        let mut record = HandoffRecord {
            id: self.ids.next_handoff_id(),
            primary_key: primary_key.clone(),
            target_server: target.server,
            snapshot: state.snapshot(),
            started_at: self.clock.now(),
            status: HandoffStatus::Pending,
        };

        state.place(target.location, target.position, target.orientation);

        let account = TransferAccountRequest {
            primary_key: primary_key.clone(),
            source_server: self.local_server,
            location: state.location,
            x: state.position.x,
            y: state.position.y,
            orientation: state.orientation,
        };

        tracing::info!(
            handoff_id = %record.id,
            primary_key = %primary_key,
            target_server = %target.server,
            location = %target.location,
            "Starting remote handoff"
        );

        match self.transfer(target.server, account).await {
            Ok(()) => {
                let origin = record.snapshot.location;
                state.sync_id.bump();
                if self.registry.remove_player(&origin, primary_key).is_some() {
                    let left = ServerMessage::PlayerLeftScope {
                        primary_key: primary_key.clone(),
                        location: origin,
                    };
                    self.registry
                        .broadcast(&origin, BroadcastGroup::Extended, &left, Some(primary_key));
                }
                record.status = HandoffStatus::Succeeded;
                tracing::info!(
                    handoff_id = %record.id,
                    primary_key = %primary_key,
                    target_server = %target.server,
                    "Remote handoff succeeded"
                );
            }
            Err(e) => {
                state.restore(record.snapshot);
                record.status = HandoffStatus::Failed(e.to_string());
                tracing::info!(
                    handoff_id = %record.id,
                    primary_key = %primary_key,
                    target_server = %target.server,
                    error = %e,
                    "Remote handoff failed, state rolled back"
                );
            }
        }

        record
    }

    async fn transfer(
        &self,
        server: ServerId,
        account: TransferAccountRequest,
    ) -> Result<(), HandoffError> {
        tokio::time::timeout(self.timeout, self.gateway.transfer_account(server, account))
            .await
            .map_err(|_| HandoffError::Timeout(self.timeout))?
            .map_err(HandoffError::from)
    }
}
