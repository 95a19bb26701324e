pub mod backend;
pub mod builder;
pub mod client;
pub mod compress;
pub mod models;
pub mod queue;
pub mod rest;
pub mod store;

pub use backend::MessageBackend;
pub use builder::MessagePersistenceBuilder;
pub use client::MessagePersistence;
pub use compress::{compress_tool_call, compress_tool_calls};
pub use models::{FlushReport, NewMessage, QueuedMessage, StoredMessage, ToolSummary};
pub use queue::{truncate_content, RetryQueue, RetryQueueConfig, RETRY_QUEUE_KEY, TRUNCATION_MARKER};
pub use rest::{ensure_success, RestBackend};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
