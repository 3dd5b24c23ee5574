//! Jira tool handlers and the registry the MCP server dispatches through.
//!
//! Handlers never see credentials as arguments; they read the request scope
//! installed by the server (`crate::auth::with_request_auth`).

use std::collections::BTreeMap;
use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use anyhow::Result;
use rmcp::model::{CallToolResult, JsonObject, Tool as McpTool};
use uuid::Uuid;

/// Per-call data that is not part of the credential scope.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Correlates the call's log lines.
    pub request_id: Uuid,
}

impl ToolContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A single Jira tool.
///
/// Auth and Jira failures are returned as `Ok` results with `is_error`
/// set; `Err` is reserved for failures the caller cannot act on.
pub trait ToolHandler: Send + Sync {
    /// Wire name, e.g. `jira_get_issue`.
    fn name(&self) -> &str;

    fn title(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> JsonObject;

    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>>;

    /// Descriptor advertised in `tools/list`.
    fn to_mcp_tool(&self) -> McpTool {
        McpTool {
            name: Cow::Owned(self.name().to_string()),
            title: self.title().map(str::to_string),
            description: Some(Cow::Owned(self.description().to_string())),
            input_schema: Arc::new(self.input_schema()),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

/// Name-ordered set of Jira tool handlers.
#[derive(Clone)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Add `handler` under its own name, replacing any handler of that name.
    pub fn register_handler<T: ToolHandler + 'static>(mut self, handler: T) -> Self {
        self.handlers.insert(handler.name().to_string(), Arc::new(handler));
        self
    }

    /// Tool descriptors for `tools/list`.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.handlers.values().map(|h| h.to_mcp_tool()).collect()
    }

    /// Run the handler registered as `name`.
    pub async fn call_tool(
        &self,
        name: &str,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult> {
        let Some(handler) = self.handlers.get(name) else {
            anyhow::bail!("Tool not found: {}", name);
        };
        handler.execute(args, ctx).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;

    struct EchoTool;

    impl ToolHandler for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn input_schema(&self) -> JsonObject {
            JsonObject::new()
        }

        fn execute(
            &self,
            args: JsonObject,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
            Box::pin(async move {
                Ok(CallToolResult {
                    content: vec![Content::text(serde_json::to_string(&args)?)],
                    structured_content: None,
                    is_error: Some(false),
                    meta: None,
                })
            })
        }
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ToolRegistry::new().register_handler(EchoTool);
        assert!(registry.contains("echo"));
        assert_eq!(registry.list_tools().len(), 1);

        let mut args = JsonObject::new();
        args.insert("x".to_string(), serde_json::json!(1));
        let result = registry.call_tool("echo", args, &ToolContext::new()).await.unwrap();
        assert_eq!(result.is_error, Some(false));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(!registry.contains("missing"));
        let err = registry
            .call_tool("missing", JsonObject::new(), &ToolContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Tool not found"));
    }

    #[test]
    fn test_to_mcp_tool() {
        let tool = EchoTool.to_mcp_tool();
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.description.as_deref(), Some("Echo the arguments back"));
    }
}
