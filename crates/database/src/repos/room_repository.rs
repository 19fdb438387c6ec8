//! Repository for room and membership data access operations.

use crate::entities::{Room, RoomKind, RoomMember};
use crate::types::ChatResult;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for room database operations
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    /// Create a new room repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a room by its id
    pub async fn find_by_id(&self, room_id: i64) -> ChatResult<Option<Room>> {
        let row = sqlx::query("SELECT id, kind, created_at FROM rooms WHERE id = ?")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(room_from_row).transpose()
    }

    /// Find the private room for a canonical user pair
    pub async fn find_by_pair_key(&self, pair_key: &str) -> ChatResult<Option<Room>> {
        let row = sqlx::query("SELECT id, kind, created_at FROM rooms WHERE pair_key = ?")
            .bind(pair_key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(room_from_row).transpose()
    }

    /// Find all rooms a user is a member of, newest membership first
    pub async fn find_by_user_id(&self, user_id: i64) -> ChatResult<Vec<Room>> {
        let rows = sqlx::query(
            "SELECT r.id, r.kind, r.created_at
             FROM rooms r
             JOIN room_members m ON r.id = m.room_id
             WHERE m.user_id = ?
             ORDER BY m.joined_at DESC, r.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(room_from_row).collect()
    }

    /// Check whether a membership row exists for (room, user)
    pub async fn is_member(&self, room_id: i64, user_id: i64) -> ChatResult<bool> {
        let row = sqlx::query("SELECT 1 FROM room_members WHERE room_id = ? AND user_id = ?")
            .bind(room_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// List the members of a room in join order
    pub async fn members_of(&self, room_id: i64) -> ChatResult<Vec<RoomMember>> {
        let rows = sqlx::query(
            "SELECT id, room_id, user_id, joined_at
             FROM room_members WHERE room_id = ? ORDER BY joined_at ASC, id ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        let members = rows
            .into_iter()
            .map(|row| {
                Ok(RoomMember {
                    id: row.try_get("id")?,
                    room_id: row.try_get("room_id")?,
                    user_id: row.try_get("user_id")?,
                    joined_at: row.try_get("joined_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(members)
    }

    /// Atomically create a private room plus both membership rows.
    ///
    /// Returns `Ok(None)` when a room for the same canonical pair already
    /// exists; the caller re-reads the winner. Any other failure rolls the
    /// transaction back, so a room row is never left without its members.
    pub async fn create_private(
        &self,
        pair_key: &str,
        user_a: i64,
        user_b: i64,
    ) -> ChatResult<Option<Room>> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO rooms (kind, pair_key, created_at) VALUES (?, ?, ?)")
            .bind(RoomKind::Private.as_str())
            .bind(pair_key)
            .bind(&now)
            .execute(&mut *tx)
            .await;

        let room_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(err) if is_unique_violation(&err) => {
                // Lost the compare-and-create race; the existing room wins.
                tx.rollback().await?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        for user_id in [user_a, user_b] {
            sqlx::query("INSERT INTO room_members (room_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(room_id)
                .bind(user_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            room_id = room_id,
            pair_key = pair_key,
            "created private room"
        );

        Ok(Some(Room {
            id: room_id,
            kind: RoomKind::Private,
            created_at: now,
        }))
    }

    /// Count private rooms stored for a canonical pair
    pub async fn count_private_for_pair(&self, pair_key: &str) -> ChatResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM rooms WHERE pair_key = ?")
            .bind(pair_key)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("count")?)
    }
}

fn room_from_row(row: sqlx::sqlite::SqliteRow) -> ChatResult<Room> {
    let kind_str: String = row.try_get("kind")?;

    Ok(Room {
        id: row.try_get("id")?,
        kind: RoomKind::from(kind_str.as_str()),
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
