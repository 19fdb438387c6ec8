//! Shared application state for the gateway

use murmur_chats::{
    AccessAuthority, ConnectionRegistry, MessageStore, RoomDirectory, RoomProvisioner, ServerEvent,
};
use murmur_config::ChatConfig;
use murmur_database::{ChatMessage, ChatResult, Room};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared application state wiring the chat core together.
///
/// Both surfaces (streaming and REST) go through the same methods, so the
/// authorization-before-effect ordering is enforced in exactly one place.
pub struct GatewayState {
    pub store: MessageStore,
    pub directory: RoomDirectory,
    pub authority: AccessAuthority,
    pub provisioner: RoomProvisioner,
    pub registry: Arc<ConnectionRegistry>,
    pub chat: ChatConfig,
}

impl GatewayState {
    /// Create a new gateway state over a prepared database pool
    pub fn new(pool: SqlitePool, chat: ChatConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            store: MessageStore::new(pool.clone(), &chat),
            directory: RoomDirectory::new(pool.clone(), &chat),
            authority: AccessAuthority::new(pool.clone(), &chat),
            provisioner: RoomProvisioner::new(pool, &chat),
            registry,
            chat,
        }
    }

    /// Append a message and fan it out to the room's live subscribers.
    ///
    /// The publish happens strictly after the append commits; a failed
    /// append publishes nothing. Not retried here: a blind retry could
    /// duplicate the message.
    pub async fn send_message(
        &self,
        user_id: i64,
        room_id: i64,
        content: &str,
    ) -> ChatResult<ChatMessage> {
        self.authority.ensure_member(room_id, user_id).await?;

        let message = self.store.append(room_id, user_id, content).await?;

        let delivered = self
            .registry
            .publish(
                room_id,
                &ServerEvent::Message {
                    message: message.clone(),
                },
            )
            .await;

        debug!(
            message_id = message.id,
            room_id = room_id,
            delivered = delivered,
            "fanned out message"
        );

        Ok(message)
    }

    /// Page a room's history. Read-only, so retryable storage failures are
    /// retried up to the configured bound.
    pub async fn fetch_history(
        &self,
        user_id: i64,
        room_id: i64,
        before_message_id: Option<i64>,
        limit: Option<i64>,
    ) -> ChatResult<Vec<ChatMessage>> {
        self.authority.ensure_member(room_id, user_id).await?;

        let mut attempts = 0u32;
        loop {
            match self.store.history(room_id, before_message_id, limit).await {
                Err(err) if err.is_retryable() && attempts < self.chat.history_retry_attempts => {
                    attempts += 1;
                    warn!(
                        room_id = room_id,
                        attempt = attempts,
                        error = %err,
                        "retrying history fetch"
                    );
                }
                result => return result,
            }
        }
    }

    /// Advance the caller's read watermark in a room they belong to
    pub async fn mark_read(&self, user_id: i64, room_id: i64, message_id: i64) -> ChatResult<()> {
        self.authority.ensure_member(room_id, user_id).await?;
        self.store
            .advance_watermark(room_id, user_id, message_id)
            .await
    }

    /// Resolve or create the private room between the caller and another
    /// user. Starting a DM needs no prior membership.
    pub async fn join_private(&self, user_id: i64, other_user_id: i64) -> ChatResult<Room> {
        self.provisioner.get_or_create(user_id, other_user_id).await
    }

    /// All rooms the caller is a member of
    pub async fn list_rooms(&self, user_id: i64) -> ChatResult<Vec<Room>> {
        self.directory.rooms_for(user_id).await
    }
}
