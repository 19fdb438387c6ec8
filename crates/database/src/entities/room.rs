//! Room entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub kind: RoomKind,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Private,
    Group,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Private => "private",
            RoomKind::Group => "group",
        }
    }
}

impl From<&str> for RoomKind {
    fn from(s: &str) -> Self {
        match s {
            "group" => RoomKind::Group,
            _ => RoomKind::Private,
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical key for the unordered pair of users in a private room.
///
/// Both orders of the same pair map to the same key, which is what the
/// UNIQUE constraint on `rooms.pair_key` enforces uniqueness over.
pub fn pair_key(user_a: i64, user_b: i64) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{low}:{high}")
}
