use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Complete,
    Error,
}

impl ToolStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolStatus::Complete | ToolStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Pending => "pending",
            ToolStatus::Running => "running",
            ToolStatus::Complete => "complete",
            ToolStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub agent: String,
    pub input: Value,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_schema: Option<Value>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, agent: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent: agent.into(),
            input,
            status: ToolStatus::Pending,
            result: None,
            ui_schema: None,
        }
    }

    pub fn start(&mut self) {
        if self.status == ToolStatus::Pending {
            self.status = ToolStatus::Running;
        }
    }

    /// Returns false when the invocation already reached a terminal state.
    pub fn complete(&mut self, result: Value, ui_schema: Option<Value>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ToolStatus::Complete;
        self.result = Some(result);
        self.ui_schema = ui_schema;
        true
    }

    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ToolStatus::Error;
        true
    }
}

/// Contiguous run of assistant output attributed to one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub agent: String,
    pub text: String,
    #[serde(default)]
    pub tool_call_ids: Vec<String>,
}

impl TextSegment {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            text: String::new(),
            tool_call_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    Active,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub target: String,
    pub status: DelegationStatus,
}

/// One turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub segments: Vec<TextSegment>,
    #[serde(default)]
    pub tool_invocations: Vec<ToolInvocation>,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_agent: Option<String>,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            segments: Vec::new(),
            tool_invocations: Vec::new(),
            delegations: Vec::new(),
            active_agent: None,
            streaming: false,
            created_at: Utc::now(),
        }
    }

    /// Empty assistant message that is still receiving stream events
    pub fn assistant_placeholder() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            streaming: true,
            ..Self::user("")
        }
    }

    pub fn is_finalized(&self) -> bool {
        !self.streaming
    }

    pub fn has_output(&self) -> bool {
        !self.content.is_empty() || !self.tool_invocations.is_empty()
    }

    pub fn tool(&self, id: &str) -> Option<&ToolInvocation> {
        self.tool_invocations.iter().find(|t| t.id == id)
    }

    /// Tool invocations attached to a segment, in start order
    pub fn segment_tools<'a>(&'a self, segment: &'a TextSegment) -> impl Iterator<Item = &'a ToolInvocation> + 'a {
        segment.tool_call_ids.iter().filter_map(move |id| self.tool(id))
    }

    pub fn delegation(&self, target: &str) -> Option<&Delegation> {
        self.delegations.iter().find(|d| d.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_tool_state_is_not_reentered() {
        let mut tool = ToolInvocation::new("call_0", "crawl", "seo", json!({}));
        tool.start();
        assert_eq!(tool.status, ToolStatus::Running);

        assert!(tool.complete(json!({"score": 90}), None));
        assert!(!tool.fail());
        assert!(!tool.complete(json!(null), None));
        assert_eq!(tool.status, ToolStatus::Complete);
        assert_eq!(tool.result, Some(json!({"score": 90})));
    }

    #[test]
    fn test_placeholder_is_streaming_assistant() {
        let message = Message::assistant_placeholder();
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.streaming);
        assert!(!message.has_output());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
