//! Handler for the `jira_select_site` tool.
//!
//! Pins one of the token's accessible sites so later calls resolve to it
//! without asking again.

use std::pin::Pin;
use std::sync::Arc;
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::json;
use tracing::warn;
use crate::auth::{require_access_token, set_current_cloud_id};
use crate::service::JiraService;
use crate::tools::response::{error_result, json_result, required_str};
use crate::tools::{ToolHandler, ToolContext};
use crate::types::CloudId;

/// Handler for the `jira_select_site` tool.
pub struct SelectSiteHandler {
    service: Arc<JiraService>,
}

impl SelectSiteHandler {
    /// Create a new select site handler.
    pub fn new(service: Arc<JiraService>) -> Self {
        Self { service }
    }
}

impl ToolHandler for SelectSiteHandler {
    fn name(&self) -> &str {
        "jira_select_site"
    }

    fn title(&self) -> Option<&str> {
        Some("Jira: Select Site")
    }

    fn description(&self) -> &str {
        "Choose which Jira Cloud site subsequent calls should use when your credentials \
         can access several. The choice is remembered for this token."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = serde_json::Map::new();
        properties.insert(
            "cloudId".to_string(),
            json!({
                "type": "string",
                "description": "Cloud ID of the site, as returned by `jira_list_sites`.",
            }),
        );

        schema.insert("properties".to_string(), json!(properties));
        schema.insert("required".to_string(), json!(["cloudId"]));
        schema
    }

    fn execute(
        &self,
        args: JsonObject,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let service = self.service.clone();

        Box::pin(async move {
            let Some(cloud_id) = required_str(&args, "cloudId").map(CloudId::new) else {
                return Ok(error_result("jira_select_site requires a `cloudId` string argument"));
            };

            let token = match require_access_token() {
                Ok(t) => t,
                Err(e) => return Ok(e.to_tool_result()),
            };

            let site = match service.resolver().select_site(&token, &cloud_id).await {
                Ok(site) => site,
                Err(e) => return Ok(e.to_tool_result()),
            };

            if let Err(e) = set_current_cloud_id(site.id.clone()) {
                warn!("Could not record selected cloud ID on request: {}", e);
            }

            Ok(json_result(json!({ "status": "ok", "selected": site }), false))
        })
    }
}
