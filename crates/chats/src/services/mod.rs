//! Service layer for the chat core.

pub mod access_authority;
pub mod message_store;
pub mod room_directory;
pub mod room_provisioner;

pub use access_authority::AccessAuthority;
pub use message_store::MessageStore;
pub use room_directory::RoomDirectory;
pub use room_provisioner::RoomProvisioner;

use murmur_database::{ChatError, ChatResult};
use std::future::Future;
use std::time::Duration;

/// Run a store operation under the configured deadline. A timed-out
/// operation surfaces as a retryable storage error; the underlying write,
/// if already accepted by SQLite, still completes.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = ChatResult<T>>,
) -> ChatResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::Storage(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
