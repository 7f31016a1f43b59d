//! HTTP gateway client: hands accounts to peer servers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shardline_domain::ServerId;
use shardline_shared::{TransferAccountRequest, TransferAccountResponse};

use crate::infrastructure::ports::{GatewayError, GatewayPort};

/// Path of the account-transfer endpoint on every shard.
pub const TRANSFER_PATH: &str = "/gateway/transfer";

/// Gateway client posting transfers to `{peer}/gateway/transfer`.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    peers: HashMap<ServerId, String>,
}

impl HttpGateway {
    /// `request_timeout` bounds each HTTP exchange. The handoff applies its own
    /// timeout on top.
    pub fn new(peers: HashMap<ServerId, String>, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, peers }
    }

    fn endpoint(&self, server: ServerId) -> Result<String, GatewayError> {
        self.peers
            .get(&server)
            .map(|base| format!("{}{TRANSFER_PATH}", base.trim_end_matches('/')))
            .ok_or(GatewayError::UnknownPeer(server))
    }
}

#[async_trait]
impl GatewayPort for HttpGateway {
    async fn transfer_account(
        &self,
        target_server: ServerId,
        account: TransferAccountRequest,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(target_server)?;

        let response = self
            .client
            .post(&url)
            .json(&account)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Refused {
                server: target_server,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body: TransferAccountResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if body.accepted {
            tracing::debug!(
                primary_key = %account.primary_key,
                target_server = %target_server,
                "Peer accepted account"
            );
            Ok(())
        } else {
            Err(GatewayError::Refused {
                server: target_server,
                reason: body.reason.unwrap_or_else(|| "refused".to_string()),
            })
        }
    }
}
