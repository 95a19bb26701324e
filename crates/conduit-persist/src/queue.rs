use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::QueuedMessage;
use crate::store::{KeyValueStore, StoreError};

/// Key the whole queue is stored under
pub const RETRY_QUEUE_KEY: &str = "conduit.retry_queue";

/// Appended to content cut at `max_content_len`
pub const TRUNCATION_MARKER: &str = "\n…[truncated]";

#[derive(Debug, Clone)]
pub struct RetryQueueConfig {
    pub max_entries: usize,
    pub max_content_len: usize,
    pub max_retries: u32,
    /// Entries kept when the store reports a quota failure
    pub trim_to: usize,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            max_content_len: 10_000,
            max_retries: 3,
            trim_to: 10,
        }
    }
}

impl RetryQueueConfig {
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_max_content_len(mut self, len: usize) -> Self {
        self.max_content_len = len;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_trim_to(mut self, keep: usize) -> Self {
        self.trim_to = keep;
        self
    }
}

/// Cut `content` to `max_len` characters and mark it as truncated
pub fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(max_len).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Bounded durable queue of messages that failed to reach the backend.
///
/// The whole queue lives as one JSON array under [`RETRY_QUEUE_KEY`], oldest
/// entry first. Every read-modify-write holds `lock`, so a flush can run
/// alongside a session that is enqueueing.
pub struct RetryQueue {
    store: Arc<dyn KeyValueStore>,
    config: RetryQueueConfig,
    lock: Mutex<()>,
}

impl RetryQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(store, RetryQueueConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: RetryQueueConfig) -> Self {
        Self {
            store,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RetryQueueConfig {
        &self.config
    }

    /// Add an entry. Returns false when the write had to be dropped.
    pub async fn enqueue(&self, mut entry: QueuedMessage) -> bool {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await;

        if entries.iter().any(|e| e.id == entry.id) {
            tracing::debug!(id = %entry.id, "message already queued");
            return true;
        }

        entry.content = truncate_content(&entry.content, self.config.max_content_len);
        entries.push(entry);

        if entries.len() > self.config.max_entries {
            let overflow = entries.len() - self.config.max_entries;
            tracing::warn!(overflow, "retry queue full, evicting oldest entries");
            entries.drain(..overflow);
        }

        self.save(entries).await
    }

    pub async fn entries(&self) -> Vec<QueuedMessage> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Entries still eligible for another delivery attempt
    pub async fn pending(&self) -> Vec<QueuedMessage> {
        let max_retries = self.config.max_retries;
        self.entries()
            .await
            .into_iter()
            .filter(|e| e.retry_count < max_retries)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove delivered entries by id, returning how many were removed
    pub async fn remove(&self, ids: &[String]) -> usize {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.retain(|e| !ids.contains(e.id.as_str())).await
    }

    /// Drop every entry of a thread whose history the backend confirmed
    pub async fn purge_thread(&self, thread_id: &str) -> usize {
        self.retain(|e| e.thread_id != thread_id).await
    }

    /// Count a failed attempt for `ids`; entries reaching `max_retries`
    /// are dropped. Returns how many were dropped.
    pub async fn mark_retried(&self, ids: &[String]) -> usize {
        let _guard = self.lock.lock().await;
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let max_retries = self.config.max_retries;

        let mut entries = self.load().await;
        for entry in entries.iter_mut().filter(|e| ids.contains(e.id.as_str())) {
            entry.retry_count += 1;
        }

        let before = entries.len();
        entries.retain(|e| {
            let exhausted = e.retry_count >= max_retries;
            if exhausted {
                tracing::warn!(id = %e.id, thread_id = %e.thread_id, "dropping message after {} failed deliveries", e.retry_count);
            }
            !exhausted
        });
        let dropped = before - entries.len();

        self.save(entries).await;
        dropped
    }

    pub async fn clear(&self) {
        let _guard = self.lock.lock().await;
        if let Err(e) = self.store.remove(RETRY_QUEUE_KEY).await {
            tracing::warn!("Failed to clear retry queue: {}", e);
        }
    }

    async fn retain(&self, keep: impl Fn(&QueuedMessage) -> bool) -> usize {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await;
        let before = entries.len();
        entries.retain(|e| keep(e));
        let removed = before - entries.len();
        if removed > 0 {
            self.save(entries).await;
        }
        removed
    }

    async fn load(&self) -> Vec<QueuedMessage> {
        let raw = match self.store.get(RETRY_QUEUE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read retry queue: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable retry queue: {}", e);
            Vec::new()
        })
    }

    /// Write the queue; on a quota failure keep only the most recent
    /// `trim_to` entries and try once more.
    async fn save(&self, mut entries: Vec<QueuedMessage>) -> bool {
        match self.write(&entries).await {
            Ok(()) => return true,
            Err(StoreError::QuotaExceeded { needed, limit }) => {
                tracing::warn!(needed, limit, "retry queue hit storage quota, trimming");
            }
            Err(e) => {
                tracing::warn!("Failed to write retry queue: {}", e);
                return false;
            }
        }

        if entries.len() > self.config.trim_to {
            let excess = entries.len() - self.config.trim_to;
            entries.drain(..excess);
        }

        match self.write(&entries).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropping retry queue write after trim: {}", e);
                false
            }
        }
    }

    async fn write(&self, entries: &[QueuedMessage]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return self.store.remove(RETRY_QUEUE_KEY).await;
        }
        let raw = serde_json::to_string(entries)?;
        self.store.set(RETRY_QUEUE_KEY, &raw).await
    }
}
