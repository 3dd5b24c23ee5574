//! Tool handler registry for managing MCP tool implementations.
//!
//! This module provides a simple way to register and invoke tool handlers,
//! making it easy to add new tools without modifying the core `ServerHandler`
//! implementation.

mod registry;
mod response;

pub use registry::{ToolHandler, ToolRegistry, ToolContext};

// Tool handler implementations
mod list_sites;
mod select_site;
mod get_myself;
mod get_issue;

pub use list_sites::ListSitesHandler;
pub use select_site::SelectSiteHandler;
pub use get_myself::GetMyselfHandler;
pub use get_issue::GetIssueHandler;

use std::sync::Arc;
use crate::service::JiraService;

/// Registry with every Jira tool bound to `service`.
pub fn default_registry(service: Arc<JiraService>) -> ToolRegistry {
    ToolRegistry::new()
        .register_handler(ListSitesHandler::new(service.clone()))
        .register_handler(SelectSiteHandler::new(service.clone()))
        .register_handler(GetMyselfHandler::new(service.clone()))
        .register_handler(GetIssueHandler::new(service))
}
