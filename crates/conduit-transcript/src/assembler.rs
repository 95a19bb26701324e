use conduit_types::{
    AgentEvent, Delegation, DelegationStatus, Message, TextSegment, ToolInvocation, ToolStatus,
    DEFAULT_ORCHESTRATOR, FALLBACK_ERROR_TEXT, TOOLS_PSEUDO_AGENT,
};
use serde_json::Value;

/// Result of applying one event to the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Event applied, stream continues
    Continue,
    /// Message was already finalized; event dropped
    Ignored,
    /// `end` received, message finalized
    Ended,
    /// `error` received, message finalized with an error state
    Failed(String),
}

/// Folds orchestration events into one assistant [`Message`].
///
/// All "current agent" tracking lives on the message itself
/// (`active_agent`, `delegations`), so applying the same event sequence to
/// two fresh messages yields identical segments, tools and delegations.
#[derive(Debug, Clone)]
pub struct TranscriptAssembler {
    message: Message,
    orchestrator: String,
    structured_response: Option<Value>,
    server_thread_id: Option<String>,
    error: Option<String>,
}

impl TranscriptAssembler {
    pub fn new(message: Message) -> Self {
        Self::with_orchestrator(message, DEFAULT_ORCHESTRATOR)
    }

    pub fn with_orchestrator(message: Message, orchestrator: impl Into<String>) -> Self {
        Self {
            message,
            orchestrator: orchestrator.into(),
            structured_response: None,
            server_thread_id: None,
            error: None,
        }
    }

    /// Apply a whole event sequence to `message`
    pub fn replay(message: Message, events: impl IntoIterator<Item = AgentEvent>) -> Self {
        let mut assembler = Self::new(message);
        for event in events {
            assembler.apply(event);
        }
        assembler
    }

    pub fn apply(&mut self, event: AgentEvent) -> Step {
        if self.message.is_finalized() {
            tracing::debug!(kind = event.kind(), "ignoring event for finalized message");
            return Step::Ignored;
        }

        match event {
            AgentEvent::Token { content, agent } => self.on_token(&content, agent),
            AgentEvent::ToolStart { name, input } => self.on_tool_start(name, input),
            AgentEvent::ToolEnd { name, output, ui_schema } => self.on_tool_end(&name, output, ui_schema),
            AgentEvent::Delegate { target } => self.on_delegate(target),
            AgentEvent::AgentSwitch { agent } => self.on_agent_switch(agent),
            AgentEvent::StructuredResponse { payload } => {
                self.structured_response = Some(payload);
            }
            AgentEvent::ThreadId { thread_id } => {
                self.server_thread_id = Some(thread_id);
            }
            AgentEvent::Error { message } => {
                self.fail(message.clone());
                return Step::Failed(message);
            }
            AgentEvent::End => {
                self.finish();
                return Step::Ended;
            }
        }

        Step::Continue
    }

    fn on_token(&mut self, content: &str, agent: Option<String>) {
        if content.is_empty() {
            return;
        }
        let agent = agent
            .filter(|a| !a.is_empty())
            .or_else(|| self.message.active_agent.clone())
            .unwrap_or_else(|| self.orchestrator.clone());
        self.push_text(agent, content);
    }

    fn push_text(&mut self, agent: String, text: &str) {
        self.message.content.push_str(text);
        match self.message.segments.last_mut() {
            Some(last) if last.agent == agent => last.text.push_str(text),
            _ => {
                let mut segment = TextSegment::new(agent);
                segment.text.push_str(text);
                self.message.segments.push(segment);
            }
        }
    }

    fn on_tool_start(&mut self, name: String, input: Value) {
        let owner = self.resolve_tool_owner();
        let id = format!("call_{}", self.message.tool_invocations.len());

        let mut tool = ToolInvocation::new(id.clone(), name, owner.clone(), input);
        tool.start();

        let index = self.segment_index_for(&owner);
        self.message.segments[index].tool_call_ids.push(id);
        self.message.tool_invocations.push(tool);
    }

    /// Owner of a new tool call, first match wins:
    /// active delegation, any delegation, non-orchestrator active agent,
    /// latest non-orchestrator segment, then the tools pseudo-agent.
    fn resolve_tool_owner(&self) -> String {
        let delegations = &self.message.delegations;

        if let Some(d) = delegations.iter().rev().find(|d| d.status == DelegationStatus::Active) {
            return d.target.clone();
        }
        if let Some(d) = delegations.last() {
            return d.target.clone();
        }
        if let Some(agent) = self.message.active_agent.as_ref().filter(|a| **a != self.orchestrator) {
            return agent.clone();
        }
        if let Some(segment) = self.message.segments.iter().rev().find(|s| s.agent != self.orchestrator) {
            return segment.agent.clone();
        }
        TOOLS_PSEUDO_AGENT.to_string()
    }

    /// Latest segment of `agent`, appending an empty one when there is none
    fn segment_index_for(&mut self, agent: &str) -> usize {
        match self.message.segments.iter().rposition(|s| s.agent == agent) {
            Some(index) => index,
            None => {
                self.message.segments.push(TextSegment::new(agent));
                self.message.segments.len() - 1
            }
        }
    }

    fn on_tool_end(&mut self, name: &str, output: Value, ui_schema: Option<Value>) {
        let running = self
            .message
            .tool_invocations
            .iter_mut()
            .rev()
            .find(|t| t.name == name && t.status == ToolStatus::Running);

        match running {
            Some(tool) => {
                tool.complete(output, ui_schema);
            }
            None => tracing::debug!(tool = name, "tool_end without running invocation, dropped"),
        }
    }

    fn on_delegate(&mut self, target: String) {
        self.message.active_agent = Some(target.clone());

        if let Some(existing) = self.message.delegations.iter_mut().find(|d| d.target == target) {
            existing.status = DelegationStatus::Active;
            return;
        }

        self.message.delegations.push(Delegation {
            target: target.clone(),
            status: DelegationStatus::Active,
        });
        if !self.message.segments.iter().any(|s| s.agent == target) {
            self.message.segments.push(TextSegment::new(target));
        }
    }

    fn on_agent_switch(&mut self, agent: String) {
        if agent == self.orchestrator {
            for delegation in &mut self.message.delegations {
                delegation.status = DelegationStatus::Complete;
            }
        }
        self.message.active_agent = Some(agent);
    }

    /// Finalize with an error state. Running tools become `Error`, and an
    /// empty message gets the fallback text so the failure is visible.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.message.is_finalized() {
            return;
        }
        let reason = reason.into();
        tracing::warn!(%reason, message_id = %self.message.id, "transcript finalized with error");

        if self.error.is_none() {
            self.error = Some(reason);
        }
        if self.message.content.is_empty() {
            let orchestrator = self.orchestrator.clone();
            self.push_text(orchestrator, FALLBACK_ERROR_TEXT);
        }
        for tool in &mut self.message.tool_invocations {
            if tool.status == ToolStatus::Running || tool.status == ToolStatus::Pending {
                tool.fail();
            }
        }
        self.message.streaming = false;
    }

    /// Finalize cleanly; the message becomes immutable
    pub fn finish(&mut self) {
        self.message.streaming = false;
    }

    pub fn is_finalized(&self) -> bool {
        self.message.is_finalized()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn structured_response(&self) -> Option<&Value> {
        self.structured_response.as_ref()
    }

    pub fn server_thread_id(&self) -> Option<&str> {
        self.server_thread_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn orchestrator(&self) -> &str {
        &self.orchestrator
    }

    pub fn into_parts(self) -> TranscriptParts {
        TranscriptParts {
            message: self.message,
            structured_response: self.structured_response,
            server_thread_id: self.server_thread_id,
            error: self.error,
        }
    }
}

/// Everything the assembler captured, detached from the assembler
#[derive(Debug, Clone)]
pub struct TranscriptParts {
    pub message: Message,
    pub structured_response: Option<Value>,
    pub server_thread_id: Option<String>,
    pub error: Option<String>,
}
