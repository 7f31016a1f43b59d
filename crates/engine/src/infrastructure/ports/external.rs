//! External collaborator ports (gateway, encounter memory).

use async_trait::async_trait;
use shardline_domain::{Location, PlayerKey, ServerId};
use shardline_shared::TransferAccountRequest;

use super::error::GatewayError;

// =============================================================================
// Gateway
// =============================================================================

/// Hands a player's account over to the server owning their next scope.
///
/// `Ok(())` means the peer accepted the account and now owns the player.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayPort: Send + Sync {
    async fn transfer_account(
        &self,
        target_server: ServerId,
        account: TransferAccountRequest,
    ) -> Result<(), GatewayError>;
}

// =============================================================================
// Encounter memory
// =============================================================================

/// Suppresses repeated introductions between players.
///
/// The shard only tells it when a player's scope changes or the player leaves.
#[cfg_attr(test, mockall::automock)]
pub trait EncounterMemoryPort: Send + Sync {
    fn scope_changed(&self, primary_key: &PlayerKey, from: Location, to: Location);
    fn forget(&self, primary_key: &PlayerKey);
}
