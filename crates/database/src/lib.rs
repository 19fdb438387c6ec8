//! Murmur Database Crate
//!
//! This crate provides database functionality for the Murmur chat backend,
//! including connection management, migrations, and repository
//! implementations for rooms, messages, and read watermarks.

use murmur_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{MessageRepository, RoomRepository};

// Re-export entities
pub use entities::{pair_key, ChatMessage, ReadWatermark, Room, RoomKind, RoomMember};

// Re-export types
pub use types::{ChatError, ChatResult, DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
