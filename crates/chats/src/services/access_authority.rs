//! Membership-based access decisions.

use super::with_timeout;
use crate::utils::Validator;
use murmur_config::ChatConfig;
use murmur_database::{ChatError, ChatResult, RoomRepository};
use sqlx::SqlitePool;
use std::time::Duration;

/// Decides whether a user may read or write a room.
///
/// Consulted on every operation; the result is never cached past the call,
/// so membership changes take effect immediately. A connection's
/// subscription list governs delivery only, never authorization.
pub struct AccessAuthority {
    rooms: RoomRepository,
    op_timeout: Duration,
}

impl AccessAuthority {
    /// Create a new access authority
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        Self {
            rooms: RoomRepository::new(pool),
            op_timeout: Duration::from_millis(config.storage_timeout_ms),
        }
    }

    /// True iff a membership row exists for (room, user)
    pub async fn can_access(&self, room_id: i64, user_id: i64) -> ChatResult<bool> {
        Validator::room_id(room_id)?;
        Validator::user_id(user_id)?;

        with_timeout(
            self.op_timeout,
            "membership check",
            self.rooms.is_member(room_id, user_id),
        )
        .await
    }

    /// Fail with `Forbidden` unless the user is a member of the room
    pub async fn ensure_member(&self, room_id: i64, user_id: i64) -> ChatResult<()> {
        if self.can_access(room_id, user_id).await? {
            Ok(())
        } else {
            Err(ChatError::forbidden(format!(
                "user {user_id} is not a member of room {room_id}"
            )))
        }
    }
}
