//! Read-watermark entity definitions

use serde::{Deserialize, Serialize};

/// Per-user, per-room marker of the newest acknowledged message.
/// Advances monotonically; never moves backward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadWatermark {
    pub room_id: i64,
    pub user_id: i64,
    pub last_read_message_id: i64,
    pub updated_at: String,
}
