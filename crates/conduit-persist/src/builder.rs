use std::path::PathBuf;
use std::sync::Arc;

use conduit_types::{ConduitError, Result};

use crate::backend::MessageBackend;
use crate::client::MessagePersistence;
use crate::queue::{RetryQueue, RetryQueueConfig};
use crate::rest::RestBackend;
use crate::store::{FileStore, KeyValueStore, MemoryStore};

pub struct MessagePersistenceBuilder {
    backend: Option<Arc<dyn MessageBackend>>,
    base_url: Option<String>,
    api_key: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    queue_dir: Option<PathBuf>,
    quota_bytes: Option<usize>,
    queue_config: RetryQueueConfig,
}

impl MessagePersistenceBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            base_url: None,
            api_key: None,
            store: None,
            queue_dir: None,
            quota_bytes: None,
            queue_config: RetryQueueConfig::default(),
        }
    }

    /// Use a custom backend instead of the REST client
    pub fn backend(mut self, backend: Arc<dyn MessageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a custom store for the retry queue
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Keep the retry queue in files under `dir`
    pub fn queue_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.queue_dir = Some(dir.into());
        self
    }

    pub fn quota_bytes(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn queue_config(mut self, config: RetryQueueConfig) -> Self {
        self.queue_config = config;
        self
    }

    pub fn build(self) -> Result<MessagePersistence> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => {
                let base_url = self
                    .base_url
                    .ok_or_else(|| ConduitError::InvalidInput("base_url is required".to_string()))?;
                let api_key = self
                    .api_key
                    .ok_or_else(|| ConduitError::InvalidInput("api_key is required".to_string()))?;
                Arc::new(RestBackend::new(base_url, api_key)?) as Arc<dyn MessageBackend>
            }
        };

        let store: Arc<dyn KeyValueStore> = match (self.store, self.queue_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => {
                let store = FileStore::new(dir);
                Arc::new(match self.quota_bytes {
                    Some(quota) => store.with_quota(quota),
                    None => store,
                })
            }
            (None, None) => {
                tracing::warn!("no retry queue directory configured, queued messages will not survive restarts");
                Arc::new(match self.quota_bytes {
                    Some(quota) => MemoryStore::with_quota(quota),
                    None => MemoryStore::new(),
                })
            }
        };

        let queue = Arc::new(RetryQueue::with_config(store, self.queue_config));
        Ok(MessagePersistence::new(backend, queue))
    }
}

impl Default for MessagePersistenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
