//! Handler for the `jira_get_myself` tool.

use std::pin::Pin;
use std::sync::Arc;
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::json;
use crate::auth::{require_access_token, require_cloud_id};
use crate::service::JiraService;
use crate::tools::response::{jira_error_result, json_result};
use crate::tools::{ToolHandler, ToolContext};

/// Handler for the `jira_get_myself` tool.
pub struct GetMyselfHandler {
    service: Arc<JiraService>,
}

impl GetMyselfHandler {
    /// Create a new get myself handler.
    pub fn new(service: Arc<JiraService>) -> Self {
        Self { service }
    }
}

impl ToolHandler for GetMyselfHandler {
    fn name(&self) -> &str {
        "jira_get_myself"
    }

    fn title(&self) -> Option<&str> {
        Some("Jira: Current User")
    }

    fn description(&self) -> &str {
        "Return the Jira account the current credentials belong to on the selected site."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), json!({}));
        schema
    }

    fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let service = self.service.clone();

        Box::pin(async move {
            let token = match require_access_token() {
                Ok(t) => t,
                Err(e) => return Ok(e.to_tool_result()),
            };
            let cloud_id = match require_cloud_id(service.resolver()).await {
                Ok(id) => id,
                Err(e) => return Ok(e.to_tool_result()),
            };

            match service.jira().get_myself(&token, &cloud_id).await {
                Ok(user) => Ok(json_result(
                    json!({ "status": "ok", "cloudId": cloud_id, "user": user }),
                    false,
                )),
                Err(e) => Ok(jira_error_result(&e)),
            }
        })
    }
}
