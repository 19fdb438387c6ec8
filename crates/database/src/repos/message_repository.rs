//! Repository for message and read-watermark data access operations.

use crate::entities::{ChatMessage, ReadWatermark};
use crate::types::{ChatError, ChatResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to a room's log.
    ///
    /// The id comes from the store (AUTOINCREMENT, strictly increasing) and
    /// `sent_at` from the server clock; neither is caller-supplied.
    pub async fn append(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
    ) -> ChatResult<ChatMessage> {
        let room = sqlx::query("SELECT 1 FROM rooms WHERE id = ?")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        if room.is_none() {
            return Err(ChatError::RoomNotFound { id: room_id });
        }

        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (room_id, sender_id, content, sent_at) VALUES (?, ?, ?, ?)",
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(content)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id = message_id,
            room_id = room_id,
            sender_id = sender_id,
            "appended message"
        );

        Ok(ChatMessage {
            id: message_id,
            room_id,
            sender_id,
            content: content.to_string(),
            sent_at: now,
        })
    }

    /// Find a message by its id
    pub async fn find_by_id(&self, message_id: i64) -> ChatResult<Option<ChatMessage>> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, content, sent_at FROM messages WHERE id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(message_from_row).transpose()
    }

    /// Page through a room's log, newest first.
    ///
    /// The cursor is a message id; only rows strictly older than it are
    /// returned, so concurrent appends never shift a page already handed out.
    pub async fn history(
        &self,
        room_id: i64,
        before_message_id: Option<i64>,
        limit: i64,
    ) -> ChatResult<Vec<ChatMessage>> {
        let rows = match before_message_id {
            Some(before) => {
                sqlx::query(
                    "SELECT id, room_id, sender_id, content, sent_at
                     FROM messages WHERE room_id = ? AND id < ?
                     ORDER BY id DESC LIMIT ?",
                )
                .bind(room_id)
                .bind(before)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, room_id, sender_id, content, sent_at
                     FROM messages WHERE room_id = ?
                     ORDER BY id DESC LIMIT ?",
                )
                .bind(room_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(message_from_row).collect()
    }

    /// Advance a user's read watermark for a room.
    ///
    /// The upsert only applies when the new id is greater than the stored
    /// one, so a stale id is a no-op and the watermark never moves backward.
    pub async fn advance_watermark(
        &self,
        room_id: i64,
        user_id: i64,
        message_id: i64,
    ) -> ChatResult<()> {
        let message = self
            .find_by_id(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound { id: message_id })?;

        if message.room_id != room_id {
            return Err(ChatError::validation(format!(
                "message {message_id} does not belong to room {room_id}"
            )));
        }

        sqlx::query(
            "INSERT INTO read_watermarks (room_id, user_id, last_read_message_id, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (room_id, user_id) DO UPDATE SET
               last_read_message_id = excluded.last_read_message_id,
               updated_at = excluded.updated_at
             WHERE excluded.last_read_message_id > read_watermarks.last_read_message_id",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(message_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a user's read watermark for a room, if any
    pub async fn watermark(&self, room_id: i64, user_id: i64) -> ChatResult<Option<ReadWatermark>> {
        let row = sqlx::query(
            "SELECT room_id, user_id, last_read_message_id, updated_at
             FROM read_watermarks WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let watermark = match row {
            Some(row) => Some(ReadWatermark {
                room_id: row.try_get("room_id")?,
                user_id: row.try_get("user_id")?,
                last_read_message_id: row.try_get("last_read_message_id")?,
                updated_at: row.try_get("updated_at")?,
            }),
            None => None,
        };

        Ok(watermark)
    }

    /// Count messages stored for a room
    pub async fn count_for_room(&self, room_id: i64) -> ChatResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("count")?)
    }
}

fn message_from_row(row: sqlx::sqlite::SqliteRow) -> ChatResult<ChatMessage> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        sent_at: row.try_get("sent_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::pair_key;
    use crate::repos::RoomRepository;
    use crate::test_support::create_test_pool;

    async fn seeded_room(pool: &SqlitePool) -> i64 {
        RoomRepository::new(pool.clone())
            .create_private(&pair_key(1, 2), 1, 2)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let (pool, _temp_dir) = create_test_pool().await;
        let room_id = seeded_room(&pool).await;
        let repo = MessageRepository::new(pool);

        let first = repo.append(room_id, 1, "one").await.unwrap();
        let second = repo.append(room_id, 2, "two").await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.content, "one");
        assert_eq!(repo.count_for_room(room_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn append_to_unknown_room_fails() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool);

        let err = repo.append(42, 1, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::RoomNotFound { id: 42 }));
    }

    #[tokio::test]
    async fn history_pages_newest_first_with_stable_cursor() {
        let (pool, _temp_dir) = create_test_pool().await;
        let room_id = seeded_room(&pool).await;
        let repo = MessageRepository::new(pool);

        for i in 0..5 {
            repo.append(room_id, 1, &format!("msg-{i}")).await.unwrap();
        }

        let newest = repo.history(room_id, None, 2).await.unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].content, "msg-4");
        assert_eq!(newest[1].content, "msg-3");

        let cursor = newest.last().unwrap().id;
        let older = repo.history(room_id, Some(cursor), 2).await.unwrap();
        assert_eq!(older[0].content, "msg-2");
        assert_eq!(older[1].content, "msg-1");

        // A concurrent append must not disturb a page fetched with an
        // existing cursor.
        repo.append(room_id, 2, "late arrival").await.unwrap();
        let replay = repo.history(room_id, Some(cursor), 2).await.unwrap();
        assert_eq!(replay, older);
    }

    #[tokio::test]
    async fn watermark_is_monotonic() {
        let (pool, _temp_dir) = create_test_pool().await;
        let room_id = seeded_room(&pool).await;
        let repo = MessageRepository::new(pool);

        let first = repo.append(room_id, 1, "one").await.unwrap();
        let second = repo.append(room_id, 1, "two").await.unwrap();

        repo.advance_watermark(room_id, 2, second.id).await.unwrap();
        let mark = repo.watermark(room_id, 2).await.unwrap().unwrap();
        assert_eq!(mark.last_read_message_id, second.id);

        // Advancing with an older id leaves the watermark where it was.
        repo.advance_watermark(room_id, 2, first.id).await.unwrap();
        let mark = repo.watermark(room_id, 2).await.unwrap().unwrap();
        assert_eq!(mark.last_read_message_id, second.id);
    }

    #[tokio::test]
    async fn watermark_rejects_foreign_messages() {
        let (pool, _temp_dir) = create_test_pool().await;
        let rooms = RoomRepository::new(pool.clone());
        let room_a = seeded_room(&pool).await;
        let room_b = rooms
            .create_private(&pair_key(1, 3), 1, 3)
            .await
            .unwrap()
            .unwrap()
            .id;
        let repo = MessageRepository::new(pool);

        let message = repo.append(room_a, 1, "hello").await.unwrap();

        let err = repo
            .advance_watermark(room_b, 1, message.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = repo.advance_watermark(room_a, 1, 9999).await.unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound { id: 9999 }));
    }
}
