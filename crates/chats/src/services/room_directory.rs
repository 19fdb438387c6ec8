//! Durable registry of rooms and their memberships.

use super::with_timeout;
use crate::utils::Validator;
use murmur_config::ChatConfig;
use murmur_database::{ChatResult, Room, RoomRepository};
use sqlx::SqlitePool;
use std::time::Duration;

/// Read-side view over rooms and memberships.
pub struct RoomDirectory {
    rooms: RoomRepository,
    op_timeout: Duration,
}

impl RoomDirectory {
    /// Create a new room directory
    pub fn new(pool: SqlitePool, config: &ChatConfig) -> Self {
        Self {
            rooms: RoomRepository::new(pool),
            op_timeout: Duration::from_millis(config.storage_timeout_ms),
        }
    }

    /// All rooms the user is a member of
    pub async fn rooms_for(&self, user_id: i64) -> ChatResult<Vec<Room>> {
        Validator::user_id(user_id)?;

        with_timeout(
            self.op_timeout,
            "room listing",
            self.rooms.find_by_user_id(user_id),
        )
        .await
    }

    /// Ids of all rooms the user is a member of
    pub async fn room_ids_for(&self, user_id: i64) -> ChatResult<Vec<i64>> {
        let rooms = self.rooms_for(user_id).await?;
        Ok(rooms.into_iter().map(|room| room.id).collect())
    }
}
