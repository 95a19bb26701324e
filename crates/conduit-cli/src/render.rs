use std::fmt::Write;

use conduit_persist::{compress_tool_call, StoredMessage, ToolSummary};
use conduit_types::{Message, MessageRole};

/// Attributed transcript of one assistant message, one block per segment
pub fn render_message(message: &Message) -> String {
    let mut out = String::new();
    for segment in &message.segments {
        let text = segment.text.trim();
        let tools: Vec<_> = message.segment_tools(segment).collect();
        if text.is_empty() && tools.is_empty() {
            continue;
        }

        let _ = writeln!(out, "[{}]", segment.agent);
        if !text.is_empty() {
            let _ = writeln!(out, "{}", text);
        }
        for tool in tools {
            let _ = writeln!(out, "  {}", render_tool(&compress_tool_call(tool)));
        }
    }
    out
}

pub fn render_tool(summary: &ToolSummary) -> String {
    let mut line = format!("tool {} ({})", summary.name, summary.status.as_str());
    if let Some(url) = &summary.url {
        let _ = write!(line, " {}", url);
    }
    if let Some(score) = summary.score {
        let _ = write!(line, " score={}", score);
    }
    if let Some(issues) = summary.issue_count {
        let _ = write!(line, " issues={}", issues);
    }
    if let Some(success) = summary.success {
        let _ = write!(line, " success={}", success);
    }
    line
}

pub fn render_history_entry(message: &StoredMessage) -> String {
    let who = match message.role {
        MessageRole::User => "you".to_string(),
        MessageRole::Assistant if message.agent_id.is_empty() => "assistant".to_string(),
        MessageRole::Assistant => message.agent_id.clone(),
    };
    let mut line = format!("{}> {}", who, message.content.trim());
    for tool in &message.tool_calls {
        let _ = write!(line, "\n  {}", render_tool(tool));
    }
    line
}
