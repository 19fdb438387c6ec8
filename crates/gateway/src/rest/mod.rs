//! REST endpoints for the gateway.
//!
//! This is the stateless call path: it shares the Access Authority,
//! Provisioner, and Message Store with the streaming gateway but performs
//! no connection-registry subscription.

pub mod health;
pub mod message;
pub mod room;

use crate::middleware::identity_middleware;
use crate::state::GatewayState;
use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;

/// Create all REST routes under `/api`
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    let protected = Router::new()
        .merge(room::create_room_routes())
        .merge(message::create_message_routes())
        .layer(axum_middleware::from_fn(identity_middleware));

    Router::new().nest(
        "/api",
        Router::new()
            .merge(health::create_health_routes())
            .merge(protected),
    )
}
