//! Message REST endpoints

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ErrorResponse, GatewayResult};
use crate::middleware::UserId;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub sent_at: String,
}

impl From<murmur_database::ChatMessage> for MessageResponse {
    fn from(message: murmur_database::ChatMessage) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub message_id: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesQuery {
    /// Message id cursor; only messages strictly older are returned
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/rooms/:room_id/messages",
            get(list_messages).post(create_message),
        )
        .route("/rooms/:room_id/read", post(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/messages",
    tag = "messages",
    params(
        ("room_id" = i64, Path, description = "Room id"),
        ListMessagesQuery
    ),
    responses(
        (status = 200, description = "Messages, newest first", body = Vec<MessageResponse>),
        (status = 401, description = "Missing identity", body = ErrorResponse),
        (status = 403, description = "Not a member of the room", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn list_messages(
    Path(room_id): Path<i64>,
    Query(params): Query<ListMessagesQuery>,
    State(state): State<Arc<GatewayState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let messages = state
        .fetch_history(user_id, room_id, params.before, params.limit)
        .await?;

    Ok(Json(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/messages",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    request_body = CreateMessageRequest,
    responses(
        (status = 200, description = "The persisted message", body = MessageResponse),
        (status = 400, description = "Empty or over-long content", body = ErrorResponse),
        (status = 401, description = "Missing identity", body = ErrorResponse),
        (status = 403, description = "Not a member of the room", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn create_message(
    Path(room_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(request): Json<CreateMessageRequest>,
) -> GatewayResult<Json<MessageResponse>> {
    // Messages sent over REST still fan out to live streaming connections.
    let message = state
        .send_message(user_id, room_id, &request.content)
        .await?;

    Ok(Json(MessageResponse::from(message)))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/read",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    request_body = MarkReadRequest,
    responses(
        (status = 204, description = "Watermark advanced (or already past the id)"),
        (status = 400, description = "Message does not belong to the room", body = ErrorResponse),
        (status = 401, description = "Missing identity", body = ErrorResponse),
        (status = 403, description = "Not a member of the room", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
pub async fn mark_read(
    Path(room_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(request): Json<MarkReadRequest>,
) -> GatewayResult<StatusCode> {
    state
        .mark_read(user_id, room_id, request.message_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
