use conduit_types::ToolInvocation;
use serde_json::{Map, Value};

use crate::models::ToolSummary;

/// Argument keys that may be kept, first present wins
const URL_ARGUMENT_KEYS: &[&str] = &["url", "website_url", "website", "domain"];
const SCORE_KEYS: &[&str] = &["score", "overall_score", "seo_score"];
const ISSUE_COUNT_KEYS: &[&str] = &["issue_count", "issues_count"];
const SUCCESS_KEYS: &[&str] = &["success", "ok"];

const MAX_URL_LEN: usize = 500;

/// Reduce full tool invocations to storable summaries
pub fn compress_tool_calls(tools: &[ToolInvocation]) -> Vec<ToolSummary> {
    tools.iter().map(compress_tool_call).collect()
}

pub fn compress_tool_call(tool: &ToolInvocation) -> ToolSummary {
    let url = tool.input.as_object().and_then(allowed_url);
    let result = tool.result.as_ref().and_then(result_object);

    ToolSummary {
        name: tool.name.clone(),
        status: tool.status,
        url,
        score: result.as_ref().and_then(score),
        issue_count: result.as_ref().and_then(issue_count),
        success: result.as_ref().and_then(success),
    }
}

fn allowed_url(args: &Map<String, Value>) -> Option<String> {
    URL_ARGUMENT_KEYS
        .iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str))
        .map(|url| url.chars().take(MAX_URL_LEN).collect())
}

/// Results often arrive as JSON encoded in a string
fn result_object(result: &Value) -> Option<Map<String, Value>> {
    match result {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn score(result: &Map<String, Value>) -> Option<f64> {
    SCORE_KEYS.iter().find_map(|key| result.get(*key).and_then(Value::as_f64))
}

fn issue_count(result: &Map<String, Value>) -> Option<u64> {
    if let Some(issues) = result.get("issues").and_then(Value::as_array) {
        return Some(issues.len() as u64);
    }
    ISSUE_COUNT_KEYS.iter().find_map(|key| result.get(*key).and_then(Value::as_u64))
}

fn success(result: &Map<String, Value>) -> Option<bool> {
    SUCCESS_KEYS.iter().find_map(|key| result.get(*key).and_then(Value::as_bool))
}
