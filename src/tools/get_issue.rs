//! Handler for the `jira_get_issue` tool.
//!
//! Fetches one issue from the request's Jira site and returns a condensed
//! summary (status, type, people, dates, labels).

use std::pin::Pin;
use std::sync::Arc;
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::json;
use tracing::debug;
use crate::auth::{require_access_token, require_cloud_id};
use crate::service::JiraService;
use crate::tools::response::{error_result, jira_error_result, json_result, required_str};
use crate::tools::{ToolHandler, ToolContext};

/// Handler for the `jira_get_issue` tool.
pub struct GetIssueHandler {
    service: Arc<JiraService>,
}

impl GetIssueHandler {
    /// Create a new get issue handler.
    pub fn new(service: Arc<JiraService>) -> Self {
        Self { service }
    }

    /// Build the input schema for this tool.
    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = serde_json::Map::new();
        properties.insert(
            "issueKey".to_string(),
            json!({
                "type": "string",
                "description": "Issue key (e.g. PROJ-123) or numeric issue ID.",
            }),
        );

        schema.insert("properties".to_string(), json!(properties));
        schema.insert("required".to_string(), json!(["issueKey"]));
        schema
    }
}

impl ToolHandler for GetIssueHandler {
    fn name(&self) -> &str {
        "jira_get_issue"
    }

    fn title(&self) -> Option<&str> {
        Some("Jira: Get Issue")
    }

    fn description(&self) -> &str {
        "Fetch a Jira issue by key and return its summary, status, type, priority, \
         assignee, reporter, project, timestamps and labels."
    }

    fn input_schema(&self) -> JsonObject {
        self.input_schema()
    }

    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let service = self.service.clone();
        let request_id = ctx.request_id;

        Box::pin(async move {
            let Some(issue_key) = required_str(&args, "issueKey").map(str::to_string) else {
                return Ok(error_result("jira_get_issue requires an `issueKey` string argument"));
            };

            let token = match require_access_token() {
                Ok(t) => t,
                Err(e) => return Ok(e.to_tool_result()),
            };
            let cloud_id = match require_cloud_id(service.resolver()).await {
                Ok(id) => id,
                Err(e) => return Ok(e.to_tool_result()),
            };

            debug!(%request_id, %cloud_id, %issue_key, "Fetching issue");

            match service.jira().get_issue(&token, &cloud_id, &issue_key).await {
                Ok(issue) => Ok(json_result(json!({ "status": "ok", "issue": issue }), false)),
                Err(e) => Ok(jira_error_result(&e)),
            }
        })
    }
}
