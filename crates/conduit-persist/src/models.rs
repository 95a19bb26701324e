use chrono::{DateTime, Utc};
use conduit_types::{ConversationThread, Message, MessageRole, ToolStatus};
use serde::{Deserialize, Serialize};

use crate::compress::compress_tool_calls;

/// Lightweight record of a tool call, safe for long-term storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Payload of a save-message request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub id: String,
    pub thread_id: String,
    pub agent_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolSummary>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn from_message(message: &Message, thread: &ConversationThread) -> Self {
        Self {
            id: message.id.clone(),
            thread_id: thread.thread_id.clone(),
            agent_id: thread.agent_id.clone(),
            role: message.role,
            content: message.content.clone(),
            tool_calls: compress_tool_calls(&message.tool_invocations),
            created_at: message.created_at,
        }
    }
}

/// Message record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub agent_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolSummary>,
    pub created_at: DateTime<Utc>,
}

/// Retry queue entry for a message that failed to reach the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    pub thread_id: String,
    pub agent_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolSummary>,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl From<NewMessage> for QueuedMessage {
    fn from(message: NewMessage) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            agent_id: message.agent_id,
            role: message.role,
            content: message.content,
            tool_calls: message.tool_calls,
            queued_at: Utc::now(),
            retry_count: 0,
            created_at: message.created_at,
        }
    }
}

impl From<&QueuedMessage> for NewMessage {
    fn from(entry: &QueuedMessage) -> Self {
        Self {
            id: entry.id.clone(),
            thread_id: entry.thread_id.clone(),
            agent_id: entry.agent_id.clone(),
            role: entry.role,
            content: entry.content.clone(),
            tool_calls: entry.tool_calls.clone(),
            created_at: entry.created_at,
        }
    }
}

/// Outcome of one retry queue flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries submitted in the batch
    pub attempted: usize,
    /// Entries confirmed by the backend and removed
    pub delivered: usize,
    /// Entries dropped after exhausting their retries
    pub dropped: usize,
}
