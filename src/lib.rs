// Core modules
pub mod api;
pub mod auth;
mod config;
mod jira;
pub mod logging;
mod types;

// MCP surface
mod service;
mod tools;
pub mod server;

// Re-export key types and functions
pub use auth::{AuthConfig, AuthError, CredentialBundle, ResolveResult, Site, SiteResolver, TtlCache};
pub use config::{ServerConfig, load_server_config};
pub use jira::{IssueSummary, JiraClient, JiraError, JiraUser};
pub use types::{AccessToken, CloudId};

pub use service::JiraService;
pub use tools::{ToolHandler, ToolRegistry};
pub use server::McpServer;

use std::sync::Arc;
use anyhow::Result;

/// Convenience function to create a fully configured MCP server.
///
/// This builds the Jira service, starts the background cache sweep, registers
/// the default tools, and returns a McpServer that implements rmcp's
/// ServerHandler. Must be called from within a Tokio runtime.
pub fn create_server(config: &ServerConfig) -> Result<Arc<McpServer>> {
    let service = Arc::new(JiraService::from_config(config)?);
    service.start_cache_cleanup();

    let tool_registry = Arc::new(tools::default_registry(service.clone()));

    Ok(Arc::new(McpServer::new(service, tool_registry)))
}
