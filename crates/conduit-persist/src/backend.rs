use async_trait::async_trait;
use conduit_types::Result;

use crate::models::{NewMessage, StoredMessage};

/// Backend-as-a-service operations used for message persistence
///
/// Implementations map transport problems to `NetworkFailure` and
/// non-success statuses to `BackendError`.
#[async_trait]
pub trait MessageBackend: Send + Sync {
    /// Store a single message
    async fn save_message(&self, message: &NewMessage) -> Result<StoredMessage>;

    /// Ordered messages of a thread. An unknown thread is reported as
    /// `BackendError` with status 404, never as an empty list.
    async fn load_history(&self, thread_id: &str) -> Result<Vec<StoredMessage>>;

    /// Store several messages in one request
    async fn save_batch(&self, messages: &[NewMessage]) -> Result<()>;
}
