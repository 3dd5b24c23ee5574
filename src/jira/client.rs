//! HTTP access to the Jira Cloud platform REST API through the Atlassian
//! OAuth gateway (`/ex/jira/{cloudId}/...`).

use std::fmt;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::jira::model::{IssueSummary, JiraUser, RawIssue};
use crate::types::{AccessToken, CloudId};

/// Default Atlassian API gateway.
pub const DEFAULT_API_BASE_URL: &str = "https://api.atlassian.com";

/// Errors from Jira REST calls.
#[derive(Debug, Clone)]
pub enum JiraError {
    /// Request could not be sent or completed
    Http(String),
    /// Jira answered with a non-success status
    Status { status: u16, body: String },
    /// Response body did not match the expected shape
    Decode(String),
    /// Caller-supplied value cannot be used in a URL
    InvalidInput(String),
}

impl fmt::Display for JiraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(msg) => write!(f, "Jira request failed: {}", msg),
            Self::Status { status, body } => write!(f, "Jira returned HTTP {}: {}", status, body),
            Self::Decode(msg) => write!(f, "Failed to decode Jira response: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for JiraError {}

/// Thin Jira Cloud client; credentials are supplied per call.
#[derive(Clone)]
pub struct JiraClient {
    base_url: Url,
    client: reqwest::Client,
}

impl JiraClient {
    /// Create a client for the gateway at `base_url`.
    pub fn new(base_url: Url, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }

    /// Build `{base}/ex/jira/{cloudId}/rest/api/3/{segments...}`.
    fn api_url(&self, cloud_id: &CloudId, segments: &[&str]) -> Result<Url, JiraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| JiraError::InvalidInput("base URL cannot be a base".to_string()))?;
            path.pop_if_empty()
                .extend(["ex", "jira", cloud_id.as_str(), "rest", "api", "3"])
                .extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        url: Url,
    ) -> Result<T, JiraError> {
        debug!(token = %token.fingerprint(), %url, "Jira GET");

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose())
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| JiraError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| JiraError::Decode(e.to_string()))
    }

    /// Fetch the user the token belongs to.
    pub async fn get_myself(
        &self,
        token: &AccessToken,
        cloud_id: &CloudId,
    ) -> Result<JiraUser, JiraError> {
        let url = self.api_url(cloud_id, &["myself"])?;
        self.get_json(token, url).await
    }

    /// Fetch one issue by key or ID.
    pub async fn get_issue(
        &self,
        token: &AccessToken,
        cloud_id: &CloudId,
        issue_key: &str,
    ) -> Result<IssueSummary, JiraError> {
        if issue_key.trim().is_empty() {
            return Err(JiraError::InvalidInput("issue key must not be empty".to_string()));
        }
        let mut url = self.api_url(cloud_id, &["issue", issue_key.trim()])?;
        url.query_pairs_mut().append_pair(
            "fields",
            "summary,status,issuetype,priority,assignee,reporter,project,created,updated,labels",
        );
        let raw: RawIssue = self.get_json(token, url).await?;
        Ok(raw.into())
    }
}
