//! MCP server implementation using rmcp.
//!
//! Every `tools/call` gets its own credential scope: headers from the
//! inbound HTTP request (or the configured stdio defaults) are turned into a
//! `CredentialBundle` that lives exactly as long as the call.

use std::sync::Arc;

use anyhow::Result;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};
use tracing::Instrument;

use crate::auth::with_request_auth;
use crate::service::JiraService;
use crate::tools::{ToolContext, ToolRegistry};

/// Type alias for HTTP request parts stored in rmcp extensions.
type HttpParts = http::request::Parts;

const INSTRUCTIONS: &str = "Jira Cloud tools authenticated with the caller's OAuth bearer token. \
    The target site is taken from the x-jira-cloud-id header when present, otherwise it is \
    resolved from the token. If several sites are accessible, call `jira_list_sites` and then \
    `jira_select_site` with the cloud ID to use.";

/// MCP server that handles protocol requests and delegates to tool handlers.
#[derive(Clone)]
pub struct McpServer {
    service: Arc<JiraService>,
    tool_registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server with the given service and tool registry.
    pub fn new(service: Arc<JiraService>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            service,
            tool_registry,
        }
    }

    /// Get the shared service.
    pub fn service(&self) -> &Arc<JiraService> {
        &self.service
    }

    /// Get the tool registry.
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Run one tool call inside its own credential scope.
    ///
    /// Credential and resolution failures come back as tool errors; only an
    /// unknown tool name is a protocol error.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        args: JsonObject,
        headers: Option<&http::HeaderMap>,
    ) -> Result<CallToolResult, McpError> {
        if !self.tool_registry.contains(tool_name) {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {}", tool_name),
                None,
            ));
        }

        let bundle = match self.service.extractor().extract(headers) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(tool = %tool_name, "Tool call rejected: {}", e);
                return Ok(e.to_tool_result());
            }
        };

        let ctx = ToolContext::new();
        let span = tracing::info_span!(
            "tool_call",
            request_id = %ctx.request_id,
            tool = %tool_name,
            token = %bundle.access_token().fingerprint(),
        );

        let registry = self.tool_registry.clone();
        with_request_auth(bundle, async move {
            match registry.call_tool(tool_name, args, &ctx).await {
                Ok(result) => {
                    tracing::debug!(is_error = ?result.is_error, "Tool call finished");
                    Ok(result)
                }
                Err(e) => {
                    tracing::error!("Tool execution failed: {}", e);
                    Err(McpError::internal_error(
                        format!("Tool execution failed: {}", e),
                        None,
                    ))
                }
            }
        })
        .instrument(span)
        .await
    }
}

impl ServerHandler for McpServer {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.tool_registry.list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        // rmcp stores http::request::Parts in extensions for HTTP transport
        let headers = context
            .extensions
            .get::<HttpParts>()
            .map(|parts| parts.headers.clone());

        async move { self.dispatch(&tool_name, args, headers.as_ref()).await }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

/// Start the server as an MCP Streamable HTTP server.
///
/// This exposes the MCP endpoint at `/mcp` and a health check at `/health`
/// on the given bind address, e.g. `127.0.0.1:3943` or `0.0.0.0:3943`.
pub async fn start_mcp_http(server: Arc<McpServer>, bind: &str) -> Result<()> {
    let service = StreamableHttpService::new(
        {
            let server = server.clone();
            move || Ok(server.as_ref().clone())
        },
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = crate::api::create_router(server.service().clone()).nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("MCP HTTP server listening on http://{}/mcp", bind);

    axum::serve(listener, router).await?;

    Ok(())
}
