//! Server-to-server account transfer DTOs (`POST /gateway/transfer`).

use serde::{Deserialize, Serialize};

use shardline_domain::{Location, PlayerKey, ServerId};

/// Account state handed to the server that will own the player next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAccountRequest {
    pub primary_key: PlayerKey,
    pub source_server: ServerId,
    pub location: Location,
    pub x: i32,
    pub y: i32,
    pub orientation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAccountResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransferAccountResponse {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}
