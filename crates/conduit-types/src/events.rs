use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConduitError;

/// Typed event emitted by the orchestration stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Text streamed token-by-token, optionally attributed to an agent
    Token {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },

    /// An agent started invoking a tool
    ToolStart {
        name: String,
        input: Value,
    },

    /// Tool execution finished
    ToolEnd {
        name: String,
        output: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        ui_schema: Option<Value>,
    },

    /// Orchestrator handed control to a specialist
    Delegate {
        target: String,
    },

    /// Active agent changed
    AgentSwitch {
        agent: String,
    },

    /// Authoritative end-of-turn payload
    StructuredResponse {
        payload: Value,
    },

    /// Server-assigned thread identifier
    ThreadId {
        thread_id: String,
    },

    /// Fatal error reported by the server
    Error {
        message: String,
    },

    /// Orchestration finished
    End,
}

impl AgentEvent {
    pub fn token(content: impl Into<String>, agent: Option<&str>) -> Self {
        AgentEvent::Token {
            content: content.into(),
            agent: agent.map(str::to_string),
        }
    }

    pub fn tool_start(name: impl Into<String>, input: Value) -> Self {
        AgentEvent::ToolStart { name: name.into(), input }
    }

    pub fn tool_end(name: impl Into<String>, output: Value) -> Self {
        AgentEvent::ToolEnd {
            name: name.into(),
            output,
            ui_schema: None,
        }
    }

    pub fn delegate(target: impl Into<String>) -> Self {
        AgentEvent::Delegate { target: target.into() }
    }

    pub fn agent_switch(agent: impl Into<String>) -> Self {
        AgentEvent::AgentSwitch { agent: agent.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Token { .. } => "token",
            AgentEvent::ToolStart { .. } => "tool_start",
            AgentEvent::ToolEnd { .. } => "tool_end",
            AgentEvent::Delegate { .. } => "delegate",
            AgentEvent::AgentSwitch { .. } => "agent_switch",
            AgentEvent::StructuredResponse { .. } => "structured_response",
            AgentEvent::ThreadId { .. } => "thread_id",
            AgentEvent::Error { .. } => "error",
            AgentEvent::End => "end",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub langgraph_node: Option<String>,
}

/// Loosely-typed payload as it appears on a `data:` line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub event: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub ui_schema: Option<Value>,
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

impl RawEvent {
    fn node(&self) -> Option<String> {
        self.metadata.as_ref().and_then(|m| m.langgraph_node.clone())
    }

    fn content_text(&self) -> Option<String> {
        match &self.content {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    fn require<T>(&self, value: Option<T>, field: &str) -> Result<T, ConduitError> {
        value.ok_or_else(|| {
            ConduitError::Decode(format!("'{}' event is missing '{}'", self.event, field))
        })
    }
}

impl TryFrom<RawEvent> for AgentEvent {
    type Error = ConduitError;

    fn try_from(raw: RawEvent) -> Result<Self, ConduitError> {
        let event = match raw.event.as_str() {
            "token" => AgentEvent::Token {
                content: raw.content_text().unwrap_or_default(),
                agent: raw.node(),
            },
            "tool_start" => AgentEvent::ToolStart {
                name: raw.require(raw.name.clone(), "name")?,
                input: raw.input.clone().unwrap_or_else(|| Value::Object(Default::default())),
            },
            "tool_end" => AgentEvent::ToolEnd {
                name: raw.require(raw.name.clone(), "name")?,
                output: raw.output.clone().unwrap_or(Value::Null),
                ui_schema: raw.ui_schema.clone().filter(|v| !v.is_null()),
            },
            "delegate" => AgentEvent::Delegate {
                target: raw.require(raw.name.clone().or_else(|| raw.content_text()), "name")?,
            },
            "agent_switch" => AgentEvent::AgentSwitch {
                agent: raw.require(raw.node().or_else(|| raw.name.clone()), "metadata.langgraph_node")?,
            },
            "structured_response" => AgentEvent::StructuredResponse {
                payload: raw.require(raw.output.clone().or_else(|| raw.content.clone()), "output")?,
            },
            "thread_id" => AgentEvent::ThreadId {
                thread_id: raw.require(raw.content_text(), "content")?,
            },
            "error" => AgentEvent::Error {
                message: raw.content_text().unwrap_or_else(|| "Unknown stream error".to_string()),
            },
            "end" => AgentEvent::End,
            other => {
                return Err(ConduitError::Decode(format!("unknown event kind '{}'", other)));
            }
        };

        Ok(event)
    }
}
