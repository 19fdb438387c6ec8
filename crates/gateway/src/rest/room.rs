//! Room REST endpoints

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, GatewayResult};
use crate::middleware::UserId;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomResponse {
    pub id: i64,
    pub kind: String,
    pub created_at: String,
}

impl From<murmur_database::Room> for RoomResponse {
    fn from(room: murmur_database::Room) -> Self {
        Self {
            id: room.id,
            kind: room.kind.to_string(),
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePrivateRoomRequest {
    pub other_user_id: i64,
}

/// Create room routes
pub fn create_room_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/private", post(create_private_room))
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "rooms",
    responses(
        (status = 200, description = "Rooms the caller belongs to", body = Vec<RoomResponse>),
        (status = 401, description = "Missing identity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_rooms(
    State(state): State<Arc<GatewayState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> GatewayResult<Json<Vec<RoomResponse>>> {
    let rooms = state.list_rooms(user_id).await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/rooms/private",
    tag = "rooms",
    request_body = CreatePrivateRoomRequest,
    responses(
        (status = 200, description = "The private room for the pair, created if needed", body = RoomResponse),
        (status = 400, description = "Invalid pair", body = ErrorResponse),
        (status = 401, description = "Missing identity", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn create_private_room(
    State(state): State<Arc<GatewayState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(request): Json<CreatePrivateRoomRequest>,
) -> GatewayResult<Json<RoomResponse>> {
    // This is the stateless join path: same provisioner as the streaming
    // gateway, but no registry subscription happens here.
    let room = state.join_private(user_id, request.other_user_id).await?;
    Ok(Json(RoomResponse::from(room)))
}
