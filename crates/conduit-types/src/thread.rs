use serde::{Deserialize, Serialize};

/// Identifies one ongoing exchange with an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub thread_id: String,
    pub agent_id: String,
}

impl ConversationThread {
    /// Start a thread with a client-generated id
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            thread_id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
        }
    }

    pub fn resume(thread_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Reuse `thread_id` when given, otherwise generate one
    pub fn resolve(thread_id: Option<String>, agent_id: impl Into<String>) -> Self {
        match thread_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Self::resume(id, agent_id),
            None => Self::new(agent_id),
        }
    }
}
