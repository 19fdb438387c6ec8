//! # Murmur Chats Crate
//!
//! The real-time chat core for the Murmur backend. It owns the durable
//! message log, room provisioning, membership-based access decisions, and
//! the in-memory connection registry used for room-scoped fan-out.
//!
//! ## Architecture
//!
//! - **Services**: `MessageStore`, `RoomDirectory`, `AccessAuthority`,
//!   `RoomProvisioner` over the repository layer
//! - **Registry**: `ConnectionRegistry`, volatile connection-to-room state
//! - **Types**: wire events and the shared error taxonomy
//! - **Utils**: input validation

pub mod registry;
pub mod services;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use registry::ConnectionRegistry;
pub use services::{AccessAuthority, MessageStore, RoomDirectory, RoomProvisioner};
pub use types::{ChatError, ChatResult, ClientEvent, ServerEvent};
pub use utils::Validator;
