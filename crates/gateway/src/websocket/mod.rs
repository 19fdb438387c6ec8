//! WebSocket surface for the gateway.

pub mod session;

pub use session::{handle_client_event, websocket_handler, ChatSession, SessionState};

use crate::state::GatewayState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(websocket_handler))
}
