//! Accounts transferred here by a peer, waiting for their player to connect.

use std::time::Duration;

use shardline_domain::PlayerKey;
use shardline_shared::TransferAccountRequest;

use crate::infrastructure::cache::TtlCache;

pub struct PendingArrivals {
    inner: TtlCache<PlayerKey, TransferAccountRequest>,
}

impl PendingArrivals {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlCache::new(ttl),
        }
    }

    /// Record an incoming account. A newer transfer replaces an older one.
    pub async fn insert(&self, account: TransferAccountRequest) {
        self.inner.insert(account.primary_key.clone(), account).await;
    }

    /// Look at an arrival without claiming it.
    pub async fn peek(&self, primary_key: &PlayerKey) -> Option<TransferAccountRequest> {
        self.inner.get(primary_key).await
    }

    /// Claim the arrival for a connecting player.
    pub async fn take(&self, primary_key: &PlayerKey) -> Option<TransferAccountRequest> {
        self.inner.take(primary_key).await
    }

    pub async fn contains(&self, primary_key: &PlayerKey) -> bool {
        self.inner.contains(primary_key).await
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.inner.cleanup_expired().await
    }
}
