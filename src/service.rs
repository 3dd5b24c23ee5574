//! Shared state handed to every tool handler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

use crate::auth::{CredentialExtractor, HttpResourceFetcher, SiteResolver};
use crate::config::ServerConfig;
use crate::jira::JiraClient;

/// Process-wide services: credential extraction, site resolution and the
/// Jira REST client.
pub struct JiraService {
    extractor: CredentialExtractor,
    resolver: SiteResolver,
    jira: JiraClient,
    cleanup_interval: Duration,
}

impl JiraService {
    /// Assemble a service from parts (used directly by tests).
    pub fn new(extractor: CredentialExtractor, resolver: SiteResolver, jira: JiraClient) -> Self {
        Self {
            extractor,
            resolver,
            jira,
            cleanup_interval: Duration::from_secs(crate::auth::cache::DEFAULT_CLEANUP_INTERVAL_SECONDS),
        }
    }

    /// Build the HTTP-backed service described by `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let fetcher = Arc::new(HttpResourceFetcher::new(
            config.accessible_resources_url.clone(),
            http.clone(),
        ));
        let resolver = SiteResolver::from_config(fetcher, &config.auth);
        let jira = JiraClient::new(config.api_base()?, http);

        info!(
            resources_url = %config.accessible_resources_url,
            api_base = %config.api_base_url,
            site_ttl_secs = config.auth.site_cache_ttl_seconds,
            resources_ttl_secs = config.auth.resources_cache_ttl_seconds,
            "Jira service configured"
        );

        Ok(Self {
            extractor: CredentialExtractor::new(&config.auth),
            resolver,
            jira,
            cleanup_interval: Duration::from_secs(config.auth.cleanup_interval_seconds),
        })
    }

    pub fn extractor(&self) -> &CredentialExtractor {
        &self.extractor
    }

    pub fn resolver(&self) -> &SiteResolver {
        &self.resolver
    }

    pub fn jira(&self) -> &JiraClient {
        &self.jira
    }

    /// Start the periodic sweep of both auth caches.
    pub fn start_cache_cleanup(&self) -> Vec<JoinHandle<()>> {
        self.resolver.spawn_cleanup(self.cleanup_interval)
    }
}
