//! API layer - HTTP and WebSocket entry points.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::app::App;

pub mod connections;
pub mod http;
pub mod websocket;

pub use connections::{ConnectionManager, SharedConnectionManager};

/// HTTP routes plus the `/ws` upgrade, bound to the application state.
pub fn router(app: Arc<App>) -> Router {
    http::routes()
        .route("/ws", get(websocket::ws_handler))
        .with_state(app)
}
