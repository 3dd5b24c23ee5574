//! Handler for the `jira_list_sites` tool.
//!
//! Lists the Jira Cloud sites the caller's token can access, along with the
//! site currently selected for it (if any).

use std::pin::Pin;
use std::sync::Arc;
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::json;
use tracing::debug;
use crate::auth::require_access_token;
use crate::service::JiraService;
use crate::tools::response::json_result;
use crate::tools::{ToolHandler, ToolContext};

/// Handler for the `jira_list_sites` tool.
pub struct ListSitesHandler {
    service: Arc<JiraService>,
}

impl ListSitesHandler {
    /// Create a new list sites handler.
    pub fn new(service: Arc<JiraService>) -> Self {
        Self { service }
    }
}

impl ToolHandler for ListSitesHandler {
    fn name(&self) -> &str {
        "jira_list_sites"
    }

    fn title(&self) -> Option<&str> {
        Some("Jira: List Accessible Sites")
    }

    fn description(&self) -> &str {
        "List the Jira Cloud sites your credentials can access, with their cloud IDs. \
         Use a cloud ID from this list with `jira_select_site` when more than one site is available."
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
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let service = self.service.clone();
        let request_id = ctx.request_id;

        Box::pin(async move {
            let token = match require_access_token() {
                Ok(t) => t,
                Err(e) => return Ok(e.to_tool_result()),
            };

            let resolver = service.resolver();
            let sites = match resolver.resources().get_cached_accessible_resources(&token).await {
                Ok(sites) => sites,
                Err(e) => return Ok(e.to_tool_result()),
            };
            let selected = resolver.selections().get(token.expose());

            debug!(%request_id, count = sites.len(), "Listed accessible sites");

            Ok(json_result(
                json!({
                    "status": "ok",
                    "sites": sites,
                    "selectedCloudId": selected,
                }),
                false,
            ))
        })
    }
}
