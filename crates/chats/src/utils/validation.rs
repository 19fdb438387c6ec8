//! Validation utilities.

use murmur_database::{ChatError, ChatResult};

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Validate a user identifier
    pub fn user_id(id: i64) -> ChatResult<()> {
        if id <= 0 {
            return Err(ChatError::validation("user id must be positive"));
        }

        Ok(())
    }

    /// Validate a room identifier
    pub fn room_id(id: i64) -> ChatResult<()> {
        if id <= 0 {
            return Err(ChatError::validation("room id must be positive"));
        }

        Ok(())
    }

    /// Validate a message identifier
    pub fn message_id(id: i64) -> ChatResult<()> {
        if id <= 0 {
            return Err(ChatError::validation("message id must be positive"));
        }

        Ok(())
    }

    /// Validate message content against the configured length limit.
    /// Callers trim before validating; length counts characters, not bytes.
    pub fn message_content(content: &str, max_length: usize) -> ChatResult<()> {
        if content.is_empty() {
            return Err(ChatError::validation("message content cannot be empty"));
        }

        if content.chars().count() > max_length {
            return Err(ChatError::validation(format!(
                "message content too long (max {max_length} characters)"
            )));
        }

        Ok(())
    }
}
