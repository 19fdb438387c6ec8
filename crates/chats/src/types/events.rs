//! Wire event types for the chat protocol.

use murmur_database::{ChatMessage, Room};
use serde::{Deserialize, Serialize};

/// Client events received over the streaming connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat to keep connection alive
    Ping,
    /// Send a message to a room
    Send { room_id: i64, content: String },
    /// Resolve or create the private room with another user
    JoinPrivate { user_id: i64 },
    /// Advance the read watermark for a room
    MarkRead { room_id: i64, message_id: i64 },
    /// Page through a room's message log
    History {
        room_id: i64,
        before: Option<i64>,
        limit: Option<i64>,
    },
    /// List the rooms the connected user belongs to
    ListRooms,
}

/// Server events sent to streaming clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Welcome message after the connection becomes active
    Hello {
        connection_id: String,
        room_ids: Vec<i64>,
    },
    /// Heartbeat response
    Pong,
    /// A message was appended to a subscribed room. Carries exactly what
    /// the store persisted so senders can reconcile optimistic state.
    Message { message: ChatMessage },
    /// Reply to a join_private request
    RoomJoined { room: Room },
    /// Reply to a history request, newest first
    History {
        room_id: i64,
        messages: Vec<ChatMessage>,
    },
    /// Reply to a list_rooms request
    Rooms { rooms: Vec<Room> },
    /// Reply to a mark_read request
    MarkedRead { room_id: i64, message_id: i64 },
    /// Error response
    Error { code: String, message: String },
}
