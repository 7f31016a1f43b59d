//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use shardline_shared::{TransferAccountRequest, TransferAccountResponse};

use crate::app::App;
use crate::infrastructure::gateway::TRANSFER_PATH;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route(TRANSFER_PATH, post(receive_transfer))
}

async fn health() -> &'static str {
    "OK"
}

/// Gateway receiving side: a peer hands one of its players to this server.
///
/// The account waits as a pending arrival until the player reconnects here.
async fn receive_transfer(
    State(app): State<Arc<App>>,
    Json(account): Json<TransferAccountRequest>,
) -> Result<Json<TransferAccountResponse>, ApiError> {
    let location = account.location;
    let Some(map) = app.world.resolve(location).await? else {
        tracing::warn!(
            primary_key = %account.primary_key,
            source_server = %account.source_server,
            location = %location,
            "Refusing transfer to unknown location"
        );
        return Ok(Json(TransferAccountResponse::refused(format!(
            "location {location} does not exist on server {}",
            app.settings.server_id
        ))));
    };

    if let Some(owner) = map.remote_owner(app.settings.server_id) {
        tracing::warn!(
            primary_key = %account.primary_key,
            source_server = %account.source_server,
            location = %location,
            owner = %owner,
            "Refusing transfer to a map hosted elsewhere"
        );
        return Ok(Json(TransferAccountResponse::refused(format!(
            "location {location} is hosted by server {owner}"
        ))));
    }

    tracing::info!(
        primary_key = %account.primary_key,
        source_server = %account.source_server,
        location = %location,
        "Accepted incoming transfer"
    );
    app.arrivals.insert(account).await;
    Ok(Json(TransferAccountResponse::accepted()))
}

#[derive(Debug)]
pub enum ApiError {
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal API error");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                )
                    .into_response()
            }
        }
    }
}

impl From<crate::infrastructure::ports::RepoError> for ApiError {
    fn from(e: crate::infrastructure::ports::RepoError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
