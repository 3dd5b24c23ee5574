//! Accessible-resources lookup for Atlassian OAuth tokens.
//!
//! An OAuth (3LO) token can be granted to several Jira Cloud sites. Atlassian
//! exposes the list through the `accessible-resources` endpoint; this module
//! fetches it and memoizes successful responses per token.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::cache::TtlCache;
use crate::auth::extractor::AuthError;
use crate::types::{AccessToken, CloudId};

/// Default Atlassian endpoint listing the sites a token can reach.
pub const DEFAULT_ACCESSIBLE_RESOURCES_URL: &str =
    "https://api.atlassian.com/oauth/token/accessible-resources";

/// A Jira Cloud site visible to a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Cloud ID used in `/ex/jira/{cloudId}/...` URLs.
    pub id: CloudId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Site {
    /// Create a site with no scopes or avatar.
    pub fn new(id: impl Into<CloudId>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            scopes: Vec::new(),
            avatar_url: None,
        }
    }

    /// `name (id, url)`, the form used when listing candidates to the caller.
    pub fn describe(&self) -> String {
        format!("{} ({}, {})", self.name, self.id, self.url)
    }
}

/// Source of the accessible-resources list for a token.
///
/// Implemented over HTTP for production and by in-memory fakes in tests.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch every site `token` can access.
    fn fetch_accessible_resources<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Site>, AuthError>> + Send + 'a>>;
}

/// Fetches accessible resources from Atlassian with `reqwest`.
pub struct HttpResourceFetcher {
    url: String,
    client: reqwest::Client,
}

impl HttpResourceFetcher {
    /// Create a fetcher for `url` using a shared HTTP client.
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Endpoint this fetcher calls.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, token: &AccessToken) -> Result<Vec<Site>, AuthError> {
        debug!(token = %token.fingerprint(), "Fetching accessible resources from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token.expose())
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::UpstreamFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::UpstreamFetch(format!(
                "HTTP {} from accessible-resources endpoint",
                status
            )));
        }

        response
            .json::<Vec<Site>>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

impl ResourceFetcher for HttpResourceFetcher {
    fn fetch_accessible_resources<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Site>, AuthError>> + Send + 'a>> {
        Box::pin(self.fetch(token))
    }
}

/// Cache-or-fetch wrapper around a [`ResourceFetcher`].
///
/// Only successful fetches are cached, so a failed lookup is retried on the
/// next call.
#[derive(Clone)]
pub struct ResourceResolver {
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Arc<TtlCache<Vec<Site>>>,
}

impl ResourceResolver {
    /// Create a resolver over `fetcher` backed by `cache`.
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, cache: Arc<TtlCache<Vec<Site>>>) -> Self {
        Self { fetcher, cache }
    }

    /// The underlying resources cache.
    pub fn cache(&self) -> &Arc<TtlCache<Vec<Site>>> {
        &self.cache
    }

    /// Return the sites `token` can access, from cache when fresh.
    pub async fn get_cached_accessible_resources(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<Site>, AuthError> {
        if let Some(sites) = self.cache.get(token.expose()) {
            debug!(token = %token.fingerprint(), count = sites.len(), "Accessible resources cache hit");
            return Ok(sites);
        }

        let sites = self.fetcher.fetch_accessible_resources(token).await?;
        debug!(token = %token.fingerprint(), count = sites.len(), "Fetched accessible resources");
        self.cache.set(token.expose(), sites.clone());
        Ok(sites)
    }
}
