use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::auth::{AuthConfig, DEFAULT_ACCESSIBLE_RESOURCES_URL};
use crate::jira::DEFAULT_API_BASE_URL;

/// Server configuration, read from an optional JSON file plus environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Atlassian endpoint listing the sites a token can reach
    #[serde(default = "default_accessible_resources_url")]
    pub accessible_resources_url: String,
    /// Gateway used for `/ex/jira/{cloudId}` REST calls
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout applied to every outgoing HTTP request
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_accessible_resources_url() -> String {
    DEFAULT_ACCESSIBLE_RESOURCES_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            accessible_resources_url: default_accessible_resources_url(),
            api_base_url: default_api_base_url(),
            http_timeout_seconds: default_http_timeout_seconds(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parsed and validated Jira API gateway URL.
    pub fn api_base(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url)
            .map_err(|e| anyhow::anyhow!("Invalid api_base_url `{}`: {}", self.api_base_url, e))
    }

    /// Timeout for outgoing HTTP requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.accessible_resources_url).map_err(|e| {
            anyhow::anyhow!(
                "Invalid accessible_resources_url `{}`: {}",
                self.accessible_resources_url,
                e
            )
        })?;
        self.api_base()?;
        if self.auth.cache_max_entries == 0 {
            return Err(anyhow::anyhow!("auth.cache_max_entries must be at least 1"));
        }
        if self.http_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("http_timeout_seconds must be at least 1"));
        }
        if self.auth.cleanup_interval_seconds == 0 {
            return Err(anyhow::anyhow!("auth.cleanup_interval_seconds must be at least 1"));
        }
        http::HeaderName::from_bytes(self.auth.cloud_id_header.as_bytes()).map_err(|_| {
            anyhow::anyhow!("Invalid auth.cloud_id_header `{}`", self.auth.cloud_id_header)
        })?;
        Ok(())
    }

    /// Apply environment overrides on top of file values.
    fn apply_env(&mut self) {
        if let Ok(v) = env::var("JIRA_ACCESS_TOKEN") {
            self.auth.default_access_token = Some(v);
        }
        if let Ok(v) = env::var("JIRA_CLOUD_ID") {
            self.auth.default_cloud_id = Some(v);
        }
        if let Ok(v) = env::var("JIRA_ACCESSIBLE_RESOURCES_URL") {
            self.accessible_resources_url = v;
        }
        if let Ok(v) = env::var("JIRA_API_BASE_URL") {
            self.api_base_url = v;
        }
    }

    fn expand(mut self) -> Self {
        self.accessible_resources_url = expand_env_vars(&self.accessible_resources_url);
        self.api_base_url = expand_env_vars(&self.api_base_url);
        self.auth.cloud_id_header = expand_env_vars(&self.auth.cloud_id_header);
        if let Some(token) = self.auth.default_access_token.as_mut() {
            *token = expand_env_vars(token);
        }
        if let Some(cloud_id) = self.auth.default_cloud_id.as_mut() {
            *cloud_id = expand_env_vars(cloud_id);
        }
        self
    }
}

/// Locate the config file, if any.
///
/// `explicit` (from `--config`) wins, then `JIRA_MCP_CONFIG`, then
/// `$XDG_CONFIG_HOME/jira-cloud-mcp/config.json`, then `./jira-mcp.json`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p);
    }

    if let Ok(p) = env::var("JIRA_MCP_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("jira-cloud-mcp").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("jira-mcp.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

/// Replace `${VAR}` with the variable's value.
///
/// Unset variables and unterminated placeholders are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match env::var(name) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Parse a config file without environment overrides.
pub fn load_config_file(path: &Path) -> anyhow::Result<ServerConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read config {}: {}", path.display(), e))?;
    let cfg: ServerConfig = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Could not parse config {}: {}", path.display(), e))?;
    Ok(cfg.expand())
}

/// Load configuration: file (if found), then environment, then validation.
pub fn load_server_config(explicit: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let mut cfg = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            load_config_file(&path)?
        }
        None => ServerConfig::default(),
    };

    cfg.apply_env();
    cfg.validate()?;
    Ok(cfg)
}
