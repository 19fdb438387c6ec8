//! # Murmur Gateway Crate
//!
//! The API gateway for the Murmur chat backend: the streaming WebSocket
//! surface (per-connection sessions, room fan-out) and the stateless REST
//! surface, both over the same chat core.
//!
//! ## Architecture
//!
//! - **REST**: HTTP endpoints with OpenAPI documentation
//! - **WebSocket**: the per-connection chat session state machine
//! - **State**: shared services; authorization is enforced here, once, for
//!   both surfaces
//! - **Middleware**: identity handoff and request logging

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

// Re-export main types for convenience
pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    create_router_with_arc(Arc::new(state))
}

/// Create the router over an already-shared state
pub fn create_router_with_arc(state: Arc<GatewayState>) -> Router {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_rest_routes().with_state(state.clone()))
        .merge(websocket::create_websocket_routes().with_state(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    // Add Swagger UI in debug builds
    #[cfg(debug_assertions)]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health,
                rest::room::list_rooms,
                rest::room::create_private_room,
                rest::message::list_messages,
                rest::message::create_message,
                rest::message::mark_read,
            ),
            components(
                schemas(
                    rest::health::HealthResponse,
                    rest::room::RoomResponse,
                    rest::room::CreatePrivateRoomRequest,
                    rest::message::MessageResponse,
                    rest::message::CreateMessageRequest,
                    rest::message::MarkReadRequest,
                    error::ErrorResponse,
                )
            ),
            tags(
                (name = "health", description = "Service health"),
                (name = "rooms", description = "Room listing and private-room provisioning"),
                (name = "messages", description = "Message log and read watermarks"),
            )
        )]
        struct ApiDoc;

        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}
