//! Message entity definitions

use serde::{Deserialize, Serialize};

/// A persisted chat message. Immutable once appended; `id` is assigned by
/// the store, strictly increasing, and is the total order within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub sent_at: String,
}
