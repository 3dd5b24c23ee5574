//! Minimal Jira Cloud REST client used by the tool handlers.

mod client;
mod model;

pub use client::{DEFAULT_API_BASE_URL, JiraClient, JiraError};
pub use model::{IssueSummary, JiraUser};
