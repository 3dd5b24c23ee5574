//! Shared helpers for building tool responses.

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::{Value, json};

use crate::jira::JiraError;

/// Serialize `payload` into a single text content block.
pub(crate) fn json_result(payload: Value, is_error: bool) -> CallToolResult {
    let text = serde_json::to_string(&payload)
        .unwrap_or_else(|_| "internal serialization error".to_string());
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: None,
        is_error: Some(is_error),
        meta: None,
    }
}

/// `{"status": "error", "reason": ...}` as a tool error.
pub(crate) fn error_result(reason: impl Into<String>) -> CallToolResult {
    json_result(json!({ "status": "error", "reason": reason.into() }), true)
}

/// Map a Jira REST failure into a tool error.
pub(crate) fn jira_error_result(err: &JiraError) -> CallToolResult {
    let mut payload = json!({ "status": "error", "reason": err.to_string() });
    if let JiraError::Status { status, .. } = err {
        payload["httpStatus"] = json!(status);
    }
    json_result(payload, true)
}

/// Fetch a required, non-blank string argument.
pub(crate) fn required_str<'a>(args: &'a JsonObject, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
