//! Credential extraction for inbound MCP requests.

use std::fmt;

use http::HeaderMap;
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::auth::cache::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CLEANUP_INTERVAL_SECONDS,
    DEFAULT_RESOURCES_CACHE_TTL_SECONDS, DEFAULT_SITE_CACHE_TTL_SECONDS,
};
use crate::auth::context::CredentialBundle;
use crate::auth::resources::Site;
use crate::types::{AccessToken, CloudId};

/// Default header carrying a pre-selected Jira Cloud site.
pub const DEFAULT_CLOUD_ID_HEADER: &str = "x-jira-cloud-id";

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header name for an explicit cloud ID (bypasses site resolution)
    #[serde(default = "default_cloud_id_header")]
    pub cloud_id_header: String,
    /// Token used when a request carries no `Authorization` header (stdio mode)
    #[serde(default)]
    pub default_access_token: Option<String>,
    /// Cloud ID used when a request carries no cloud ID header
    #[serde(default)]
    pub default_cloud_id: Option<String>,
    /// How long a resolved site stays selected for a token
    #[serde(default = "default_site_cache_ttl")]
    pub site_cache_ttl_seconds: u64,
    /// How long an accessible-resources list is reused
    #[serde(default = "default_resources_cache_ttl")]
    pub resources_cache_ttl_seconds: u64,
    /// Capacity of each auth cache
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Interval of the background expiry sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_cloud_id_header() -> String {
    DEFAULT_CLOUD_ID_HEADER.to_string()
}

fn default_site_cache_ttl() -> u64 {
    DEFAULT_SITE_CACHE_TTL_SECONDS
}

fn default_resources_cache_ttl() -> u64 {
    DEFAULT_RESOURCES_CACHE_TTL_SECONDS
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_cleanup_interval() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECONDS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cloud_id_header: default_cloud_id_header(),
            default_access_token: None,
            default_cloud_id: None,
            site_cache_ttl_seconds: DEFAULT_SITE_CACHE_TTL_SECONDS,
            resources_cache_ttl_seconds: DEFAULT_RESOURCES_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cleanup_interval_seconds: DEFAULT_CLEANUP_INTERVAL_SECONDS,
        }
    }
}

impl AuthConfig {
    /// Create a config for a single fixed token (stdio mode).
    pub fn with_token(token: String, cloud_id: Option<String>) -> Self {
        Self {
            default_access_token: Some(token),
            default_cloud_id: cloud_id,
            ..Default::default()
        }
    }
}

/// Authentication and site-resolution errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No usable bearer token on the request
    NoCredentials,
    /// The token has no accessible Jira Cloud sites
    NoAccessibleSites,
    /// More than one site is accessible and none was selected
    AmbiguousSite(Vec<Site>),
    /// An explicitly selected cloud ID is not among the token's sites
    UnknownSite(CloudId),
    /// The accessible-resources request failed
    UpstreamFetch(String),
    /// The accessible-resources response could not be decoded
    InvalidResponse(String),
    /// Auth context accessed outside a request scope
    NoRequestScope,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(
                f,
                "Authentication required: send an `Authorization: Bearer <token>` header"
            ),
            Self::NoAccessibleSites => {
                write!(f, "No accessible Jira Cloud sites found for this token")
            }
            Self::AmbiguousSite(sites) => {
                writeln!(
                    f,
                    "Multiple Jira Cloud sites are accessible with this token. \
                     Retry with an explicit cloud ID (via the cloud ID header or the \
                     `jira_select_site` tool). Available sites:"
                )?;
                for site in sites {
                    writeln!(f, "- {}", site.describe())?;
                }
                Ok(())
            }
            Self::UnknownSite(id) => {
                write!(f, "Cloud ID {} is not accessible with this token", id)
            }
            Self::UpstreamFetch(msg) => {
                write!(f, "Failed to fetch accessible resources: {}", msg)
            }
            Self::InvalidResponse(msg) => {
                write!(f, "Invalid accessible-resources response: {}", msg)
            }
            Self::NoRequestScope => write!(f, "No request auth scope is active"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Short machine-readable status for tool payloads.
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoCredentials => "unauthenticated",
            Self::NoAccessibleSites => "no_accessible_sites",
            Self::AmbiguousSite(_) => "site_selection_required",
            Self::UnknownSite(_) => "unknown_site",
            Self::UpstreamFetch(_) | Self::InvalidResponse(_) => "resolution_failed",
            Self::NoRequestScope => "error",
        }
    }

    /// Render this error as a tool-level error response.
    pub fn to_tool_result(&self) -> CallToolResult {
        let mut payload = json!({
            "status": self.status(),
            "reason": self.to_string(),
        });
        if let Self::AmbiguousSite(sites) = self {
            payload["sites"] = json!(sites);
        }

        let text = serde_json::to_string(&payload)
            .unwrap_or_else(|_| "internal serialization error".to_string());
        CallToolResult {
            content: vec![Content::text(text)],
            structured_content: None,
            is_error: Some(true),
            meta: None,
        }
    }
}

/// Builds a [`CredentialBundle`] from request headers.
#[derive(Debug, Clone)]
pub struct CredentialExtractor {
    cloud_id_header: String,
    default_token: Option<AccessToken>,
    default_cloud_id: Option<CloudId>,
}

impl CredentialExtractor {
    /// Create an extractor from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            cloud_id_header: config.cloud_id_header.to_ascii_lowercase(),
            default_token: non_blank(config.default_access_token.as_deref()).map(AccessToken::new),
            default_cloud_id: non_blank(config.default_cloud_id.as_deref()).map(CloudId::new),
        }
    }

    /// Extract credentials.
    ///
    /// `Some(headers)` is an HTTP request: only the headers count, and a
    /// missing, blank or non-Bearer `Authorization` header fails with
    /// `NoCredentials`. `None` is the stdio transport, which has no headers
    /// and uses the configured default token and cloud ID.
    pub fn extract(&self, headers: Option<&HeaderMap>) -> Result<CredentialBundle, AuthError> {
        let (access_token, cloud_id, from_header) = match headers {
            Some(headers) => {
                let token = headers
                    .get(http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_bearer)
                    .ok_or(AuthError::NoCredentials)?;
                let cloud_id = headers
                    .get(self.cloud_id_header.as_str())
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| non_blank(Some(v)))
                    .map(CloudId::new);
                (token, cloud_id, true)
            }
            None => {
                let token = self.default_token.clone().ok_or(AuthError::NoCredentials)?;
                (token, self.default_cloud_id.clone(), false)
            }
        };

        debug!(
            token = %access_token.fingerprint(),
            from_header,
            cloud_id_present = cloud_id.is_some(),
            "Extracted request credentials"
        );

        Ok(CredentialBundle::new(access_token, cloud_id))
    }

    /// Return `true` if a default token is configured for header-less requests.
    pub fn has_default_token(&self) -> bool {
        self.default_token.is_some()
    }
}

/// Parse `Bearer <token>`; the scheme is case-insensitive.
fn parse_bearer(value: &str) -> Option<AccessToken> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_blank(Some(token)).map(AccessToken::new)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.cloud_id_header, "x-jira-cloud-id");
        assert!(config.default_access_token.is_none());
        assert_eq!(config.site_cache_ttl_seconds, 3600);
        assert_eq!(config.resources_cache_ttl_seconds, 300);
        assert_eq!(config.cleanup_interval_seconds, 300);
    }

    #[test]
    fn test_auth_config_partial_json_uses_defaults() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"site_cache_ttl_seconds": 60}"#).unwrap();
        assert_eq!(config.site_cache_ttl_seconds, 60);
        assert_eq!(config.resources_cache_ttl_seconds, 300);
        assert_eq!(config.cloud_id_header, "x-jira-cloud-id");
    }

    #[test]
    fn test_extract_bearer_token() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());
        let h = headers(&[("authorization", "Bearer tok-1")]);

        let bundle = extractor.extract(Some(&h)).unwrap();
        assert_eq!(bundle.access_token().expose(), "tok-1");
        assert!(bundle.cloud_id().is_none());
    }

    #[test]
    fn test_extract_bearer_scheme_case_insensitive() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());
        let h = headers(&[("authorization", "bearer tok-1")]);
        assert_eq!(extractor.extract(Some(&h)).unwrap().access_token().expose(), "tok-1");
    }

    #[test]
    fn test_extract_with_cloud_id_header() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());
        let h = headers(&[
            ("authorization", "Bearer tok-1"),
            ("x-jira-cloud-id", "site-A"),
        ]);

        let bundle = extractor.extract(Some(&h)).unwrap();
        assert_eq!(bundle.cloud_id().map(|c| c.as_str()), Some("site-A"));
    }

    #[test]
    fn test_extract_missing_token_fails() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());
        let h = headers(&[("x-jira-cloud-id", "site-A")]);

        assert!(matches!(
            extractor.extract(Some(&h)),
            Err(AuthError::NoCredentials)
        ));
        assert!(matches!(extractor.extract(None), Err(AuthError::NoCredentials)));
    }

    #[test]
    fn test_extract_rejects_blank_and_basic() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());

        let blank = headers(&[("authorization", "Bearer   ")]);
        assert!(matches!(extractor.extract(Some(&blank)), Err(AuthError::NoCredentials)));

        let basic = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(matches!(extractor.extract(Some(&basic)), Err(AuthError::NoCredentials)));
    }

    #[test]
    fn test_extract_falls_back_to_defaults() {
        let config = AuthConfig::with_token("env-token".to_string(), Some("env-site".to_string()));
        let extractor = CredentialExtractor::new(&config);

        let bundle = extractor.extract(None).unwrap();
        assert_eq!(bundle.access_token().expose(), "env-token");
        assert_eq!(bundle.cloud_id().map(|c| c.as_str()), Some("env-site"));
    }

    #[test]
    fn test_header_token_wins_over_default() {
        let config = AuthConfig::with_token("env-token".to_string(), None);
        let extractor = CredentialExtractor::new(&config);
        let h = headers(&[("authorization", "Bearer header-token")]);

        let bundle = extractor.extract(Some(&h)).unwrap();
        assert_eq!(bundle.access_token().expose(), "header-token");
    }

    #[test]
    fn test_http_request_never_uses_default_token() {
        let config = AuthConfig::with_token(
            "operator-token".to_string(),
            Some("operator-site".to_string()),
        );
        let extractor = CredentialExtractor::new(&config);
        assert!(extractor.has_default_token());

        assert!(matches!(
            extractor.extract(Some(&HeaderMap::new())),
            Err(AuthError::NoCredentials)
        ));

        let basic = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(matches!(extractor.extract(Some(&basic)), Err(AuthError::NoCredentials)));

        let blank = headers(&[("authorization", "Bearer  ")]);
        assert!(matches!(extractor.extract(Some(&blank)), Err(AuthError::NoCredentials)));
    }

    #[test]
    fn test_http_request_never_uses_default_cloud_id() {
        let config = AuthConfig::with_token(
            "operator-token".to_string(),
            Some("operator-site".to_string()),
        );
        let extractor = CredentialExtractor::new(&config);
        let h = headers(&[("authorization", "Bearer user-2")]);

        let bundle = extractor.extract(Some(&h)).unwrap();
        assert_eq!(bundle.access_token().expose(), "user-2");
        assert!(bundle.cloud_id().is_none());
    }

    #[test]
    fn test_bearer_separated_by_tab() {
        let extractor = CredentialExtractor::new(&AuthConfig::default());
        let h = headers(&[("authorization", "Bearer\ttok-tab")]);
        assert_eq!(extractor.extract(Some(&h)).unwrap().access_token().expose(), "tok-tab");
    }

    #[test]
    fn test_custom_cloud_id_header() {
        let config = AuthConfig {
            cloud_id_header: "X-Atlassian-Cloud".to_string(),
            ..Default::default()
        };
        let extractor = CredentialExtractor::new(&config);
        let h = headers(&[
            ("authorization", "Bearer tok"),
            ("x-atlassian-cloud", "site-Z"),
        ]);

        let bundle = extractor.extract(Some(&h)).unwrap();
        assert_eq!(bundle.cloud_id().map(|c| c.as_str()), Some("site-Z"));
    }

    #[test]
    fn test_auth_error_display() {
        assert!(AuthError::NoCredentials.to_string().starts_with("Authentication required"));
        assert_eq!(
            AuthError::NoAccessibleSites.to_string(),
            "No accessible Jira Cloud sites found for this token"
        );
        assert_eq!(
            AuthError::UpstreamFetch("timeout".to_string()).to_string(),
            "Failed to fetch accessible resources: timeout"
        );
    }

    #[test]
    fn test_ambiguous_error_lists_sites() {
        let err = AuthError::AmbiguousSite(vec![
            Site::new("site-B", "Beta", "https://beta.atlassian.net"),
            Site::new("site-C", "Gamma", "https://gamma.atlassian.net"),
        ]);
        let text = err.to_string();
        assert!(text.contains("- Beta (site-B, https://beta.atlassian.net)"));
        assert!(text.contains("- Gamma (site-C, https://gamma.atlassian.net)"));
    }

    #[test]
    fn test_to_tool_result_is_error() {
        let err = AuthError::AmbiguousSite(vec![Site::new("site-B", "Beta", "https://b")]);
        let result = err.to_tool_result();
        assert_eq!(result.is_error, Some(true));

        let text = result.content[0].as_text().unwrap().text.clone();
        let payload: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["status"], "site_selection_required");
        assert_eq!(payload["sites"][0]["id"], "site-B");
    }
}
