//! Entity definitions for the chat core.

pub mod member;
pub mod message;
pub mod room;
pub mod watermark;

pub use member::RoomMember;
pub use message::ChatMessage;
pub use room::{pair_key, Room, RoomKind};
pub use watermark::ReadWatermark;
