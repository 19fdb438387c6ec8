//! Idempotent get-or-create of private rooms.

use super::with_timeout;
use crate::utils::Validator;
use murmur_config::ChatConfig;
use murmur_database::{pair_key, ChatError, ChatResult, Room, RoomRepository};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::debug;

/// Resolves the single private room for an unordered pair of users.
pub struct RoomProvisioner {
    rooms: RoomRepository,
    op_timeout: Duration,
}

impl RoomProvisioner {
    /// Create a new room provisioner
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        Self {
            rooms: RoomRepository::new(pool),
            op_timeout: Duration::from_millis(config.storage_timeout_ms),
        }
    }

    /// Get or create the private room for a pair of users.
    ///
    /// Concurrent callers for the same pair race on the UNIQUE pair key;
    /// the loser's insert aborts and the winner's room is returned, so every
    /// caller succeeds and observes the same room.
    pub async fn get_or_create(&self, user_a: i64, user_b: i64) -> ChatResult<Room> {
        Validator::user_id(user_a)?;
        Validator::user_id(user_b)?;
        if user_a == user_b {
            return Err(ChatError::validation(
                "cannot open a private room with yourself",
            ));
        }

        let key = pair_key(user_a, user_b);

        if let Some(room) = with_timeout(
            self.op_timeout,
            "room lookup",
            self.rooms.find_by_pair_key(&key),
        )
        .await?
        {
            debug!(room_id = room.id, pair_key = %key, "found existing private room");
            return Ok(room);
        }

        match with_timeout(
            self.op_timeout,
            "room create",
            self.rooms.create_private(&key, user_a, user_b),
        )
        .await?
        {
            Some(room) => Ok(room),
            // Lost the create race; the winner's row must exist now.
            None => with_timeout(
                self.op_timeout,
                "room re-read",
                self.rooms.find_by_pair_key(&key),
            )
            .await?
            .ok_or_else(|| {
                ChatError::internal(format!("private room for pair {key} missing after create race"))
            }),
        }
    }
}
