//! Durable message log with per-member read watermarks.

use super::with_timeout;
use crate::utils::Validator;
use murmur_config::ChatConfig;
use murmur_database::{ChatMessage, ChatResult, MessageRepository, ReadWatermark};
use sqlx::SqlitePool;
use std::time::Duration;

/// Service over the append-only message log of each room.
pub struct MessageStore {
    messages: MessageRepository,
    max_message_length: usize,
    history_page_size: i64,
    max_history_page_size: i64,
    op_timeout: Duration,
}

impl MessageStore {
    /// Create a new message store
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        Self {
            messages: MessageRepository::new(pool),
            max_message_length: config.max_message_length,
            history_page_size: config.history_page_size,
            max_history_page_size: config.max_history_page_size,
            op_timeout: Duration::from_millis(config.storage_timeout_ms),
        }
    }

    /// Append a message to a room.
    ///
    /// Content is trimmed before validation; `sent_at` and the message id
    /// come from the store, never from the caller.
    pub async fn append(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
    ) -> ChatResult<ChatMessage> {
        Validator::room_id(room_id)?;
        Validator::user_id(sender_id)?;
        let content = content.trim();
        Validator::message_content(content, self.max_message_length)?;

        with_timeout(
            self.op_timeout,
            "message append",
            self.messages.append(room_id, sender_id, content),
        )
        .await
    }

    /// Page through a room's log, newest first, cursored on a message id.
    pub async fn history(
        &self,
        room_id: i64,
        before_message_id: Option<i64>,
        limit: Option<i64>,
    ) -> ChatResult<Vec<ChatMessage>> {
        Validator::room_id(room_id)?;
        if let Some(before) = before_message_id {
            Validator::message_id(before)?;
        }
        let limit = limit
            .unwrap_or(self.history_page_size)
            .clamp(1, self.max_history_page_size);

        with_timeout(
            self.op_timeout,
            "history fetch",
            self.messages.history(room_id, before_message_id, limit),
        )
        .await
    }

    /// Advance a user's read watermark; stale ids are a no-op.
    pub async fn advance_watermark(
        &self,
        room_id: i64,
        user_id: i64,
        message_id: i64,
    ) -> ChatResult<()> {
        Validator::room_id(room_id)?;
        Validator::user_id(user_id)?;
        Validator::message_id(message_id)?;

        with_timeout(
            self.op_timeout,
            "watermark advance",
            self.messages.advance_watermark(room_id, user_id, message_id),
        )
        .await
    }

    /// Fetch a user's read watermark for a room
    pub async fn watermark(&self, room_id: i64, user_id: i64) -> ChatResult<Option<ReadWatermark>> {
        Validator::room_id(room_id)?;
        Validator::user_id(user_id)?;

        with_timeout(
            self.op_timeout,
            "watermark fetch",
            self.messages.watermark(room_id, user_id),
        )
        .await
    }
}
