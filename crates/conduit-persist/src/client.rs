use std::sync::Arc;

use conduit_types::{ConduitError, ConversationThread, Message, Result};
use tokio::sync::Mutex;

use crate::backend::MessageBackend;
use crate::builder::MessagePersistenceBuilder;
use crate::models::{FlushReport, NewMessage, QueuedMessage, StoredMessage};
use crate::queue::RetryQueue;

/// Saves finished messages, falling back to the retry queue when the
/// backend cannot be reached.
pub struct MessagePersistence {
    backend: Arc<dyn MessageBackend>,
    queue: Arc<RetryQueue>,
    flush_lock: Mutex<()>,
}

impl MessagePersistence {
    pub fn new(backend: Arc<dyn MessageBackend>, queue: Arc<RetryQueue>) -> Self {
        Self {
            backend,
            queue,
            flush_lock: Mutex::new(()),
        }
    }

    pub fn builder() -> MessagePersistenceBuilder {
        MessagePersistenceBuilder::new()
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Save one finalized message. Never fails: on any error the message is
    /// queued for a later flush and `None` is returned.
    pub async fn save(&self, message: &Message, thread: &ConversationThread) -> Option<StoredMessage> {
        if message.streaming {
            tracing::warn!(message_id = %message.id, "refusing to persist a message that is still streaming");
            return None;
        }

        let record = NewMessage::from_message(message, thread);
        match self.backend.save_message(&record).await {
            Ok(stored) => {
                tracing::debug!(message_id = %message.id, thread_id = %thread.thread_id, "message saved");
                Some(stored)
            }
            Err(e) => {
                let failure = ConduitError::PersistenceFailure(e.to_string());
                tracing::warn!(message_id = %message.id, "{}; queued for retry", failure);
                self.queue.enqueue(QueuedMessage::from(record)).await;
                None
            }
        }
    }

    /// Fetch the authoritative history of a thread. On success every queued
    /// entry of that thread is purged, since the backend now holds the record.
    pub async fn load_history(&self, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let messages = match self.backend.load_history(thread_id).await {
            Ok(messages) => messages,
            // Unknown thread: nothing confirmed server-side, keep queued entries
            Err(ConduitError::BackendError { status: 404, .. }) => {
                tracing::debug!(thread_id, "thread has no history yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let purged = self.queue.purge_thread(thread_id).await;
        if purged > 0 {
            tracing::info!(thread_id, purged, "purged queued messages after history load");
        }
        Ok(messages)
    }

    /// Deliver queued messages in one batch. Safe to call repeatedly; an
    /// empty queue or a flush already in progress is a no-op.
    pub async fn flush_retry_queue(&self) -> FlushReport {
        let Ok(_guard) = self.flush_lock.try_lock() else {
            tracing::debug!("retry queue flush already running");
            return FlushReport::default();
        };

        let pending = self.queue.pending().await;
        if pending.is_empty() {
            return FlushReport::default();
        }

        let ids: Vec<String> = pending.iter().map(|e| e.id.clone()).collect();
        let batch: Vec<NewMessage> = pending.iter().map(NewMessage::from).collect();
        let attempted = batch.len();

        match self.backend.save_batch(&batch).await {
            Ok(()) => {
                let delivered = self.queue.remove(&ids).await;
                tracing::info!(delivered, "flushed retry queue");
                FlushReport { attempted, delivered, dropped: 0 }
            }
            Err(e) => {
                tracing::warn!(attempted, "retry queue flush failed: {}", e);
                let dropped = self.queue.mark_retried(&ids).await;
                FlushReport { attempted, delivered: 0, dropped }
            }
        }
    }
}
