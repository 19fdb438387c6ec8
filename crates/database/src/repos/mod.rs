//! Repository implementations for the chat core.

pub mod message_repository;
pub mod room_repository;

pub use message_repository::MessageRepository;
pub use room_repository::RoomRepository;
