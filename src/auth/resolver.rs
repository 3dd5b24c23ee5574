//! Token-to-site resolution.
//!
//! Maps a bearer token to the Jira Cloud site a request should target:
//!
//! 1. A remembered selection for the token wins without any network call.
//! 2. Otherwise the accessible sites are looked up (cache-or-fetch).
//! 3. No sites is an error; exactly one is selected and remembered; several
//!    are returned to the caller for an explicit choice.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::cache::TtlCache;
use crate::auth::extractor::{AuthConfig, AuthError};
use crate::auth::resources::{ResourceFetcher, ResourceResolver, Site};
use crate::types::{AccessToken, CloudId};

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveResult {
    /// A single site was determined.
    Resolved {
        #[serde(rename = "cloudId")]
        cloud_id: CloudId,
    },
    /// Several sites are accessible; the caller must pick one.
    Unresolved { sites: Vec<Site> },
}

/// Resolves and remembers the site selected for each token.
#[derive(Clone)]
pub struct SiteResolver {
    resources: ResourceResolver,
    selections: Arc<TtlCache<CloudId>>,
}

impl SiteResolver {
    /// Create a resolver from existing parts.
    pub fn new(resources: ResourceResolver, selections: Arc<TtlCache<CloudId>>) -> Self {
        Self {
            resources,
            selections,
        }
    }

    /// Create a resolver with both caches sized from `config`.
    pub fn from_config(fetcher: Arc<dyn ResourceFetcher>, config: &AuthConfig) -> Self {
        let resources_cache = Arc::new(TtlCache::new(
            Duration::from_secs(config.resources_cache_ttl_seconds),
            config.cache_max_entries,
        ));
        let selections = Arc::new(TtlCache::new(
            Duration::from_secs(config.site_cache_ttl_seconds),
            config.cache_max_entries,
        ));
        Self::new(ResourceResolver::new(fetcher, resources_cache), selections)
    }

    /// Accessible-resources lookup used by this resolver.
    pub fn resources(&self) -> &ResourceResolver {
        &self.resources
    }

    /// Site-selection cache.
    pub fn selections(&self) -> &Arc<TtlCache<CloudId>> {
        &self.selections
    }

    /// Determine the cloud ID for `token`.
    pub async fn resolve_cloud_id(&self, token: &AccessToken) -> Result<ResolveResult, AuthError> {
        if let Some(cloud_id) = self.selections.get(token.expose()) {
            debug!(token = %token.fingerprint(), %cloud_id, "Site selection cache hit");
            return Ok(ResolveResult::Resolved { cloud_id });
        }

        let mut sites = self.resources.get_cached_accessible_resources(token).await?;

        match sites.len() {
            0 => Err(AuthError::NoAccessibleSites),
            1 => {
                let site = sites.remove(0);
                info!(
                    token = %token.fingerprint(),
                    cloud_id = %site.id,
                    site = %site.name,
                    "Auto-selected the only accessible Jira site"
                );
                self.selections.set(token.expose(), site.id.clone());
                Ok(ResolveResult::Resolved { cloud_id: site.id })
            }
            _ => Ok(ResolveResult::Unresolved { sites }),
        }
    }

    /// Remember `cloud_id` as the selected site for `token`.
    ///
    /// The ID must be one of the token's accessible sites.
    pub async fn select_site(&self, token: &AccessToken, cloud_id: &CloudId) -> Result<Site, AuthError> {
        let sites = self.resources.get_cached_accessible_resources(token).await?;
        let site = sites
            .into_iter()
            .find(|s| &s.id == cloud_id)
            .ok_or_else(|| AuthError::UnknownSite(cloud_id.clone()))?;

        info!(token = %token.fingerprint(), %cloud_id, site = %site.name, "Jira site selected");
        self.selections.set(token.expose(), site.id.clone());
        Ok(site)
    }

    /// Drop any remembered selection for `token`.
    pub fn forget(&self, token: &AccessToken) -> Option<CloudId> {
        self.selections.remove(token.expose())
    }

    /// Start background expiry sweeps for both caches.
    pub fn spawn_cleanup(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.selections.spawn_cleanup("site_selection", every),
            self.resources.cache().spawn_cleanup("accessible_resources", every),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resources::testing::StaticFetcher;

    fn resolver(fetcher: Arc<StaticFetcher>) -> SiteResolver {
        SiteResolver::from_config(fetcher, &AuthConfig::default())
    }

    fn site(id: &str) -> Site {
        Site::new(id, format!("Site {}", id), format!("https://{}.atlassian.net", id))
    }

    #[tokio::test]
    async fn test_single_site_auto_resolves_and_is_remembered() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![site("a")]));
        let r = resolver(fetcher.clone());
        let token = AccessToken::new("tok");

        let result = r.resolve_cloud_id(&token).await.unwrap();
        assert_eq!(result, ResolveResult::Resolved { cloud_id: CloudId::new("a") });
        assert_eq!(r.selections().get("tok"), Some(CloudId::new("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_outlives_resources_cache() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![site("a")]));
        let r = resolver(fetcher.clone());
        let token = AccessToken::new("tok");

        r.resolve_cloud_id(&token).await.unwrap();
        // Past the 5 minute resources TTL, inside the 1 hour selection TTL.
        tokio::time::advance(Duration::from_secs(600)).await;

        let result = r.resolve_cloud_id(&token).await.unwrap();
        assert_eq!(result, ResolveResult::Resolved { cloud_id: CloudId::new("a") });
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_multiple_sites_defer_without_caching_selection() {
        let fetcher = Arc::new(
            StaticFetcher::new().with("tok", vec![site("a"), site("b"), site("c")]),
        );
        let r = resolver(fetcher);
        let token = AccessToken::new("tok");

        match r.resolve_cloud_id(&token).await.unwrap() {
            ResolveResult::Unresolved { sites } => assert_eq!(sites.len(), 3),
            other => panic!("expected Unresolved, got {:?}", other),
        }
        assert!(r.selections().is_empty());
    }

    #[tokio::test]
    async fn test_no_sites_fails() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![]));
        let r = resolver(fetcher);

        let err = r.resolve_cloud_id(&AccessToken::new("tok")).await.unwrap_err();
        assert!(matches!(err, AuthError::NoAccessibleSites));
        assert!(r.selections().is_empty());
    }

    #[tokio::test]
    async fn test_cached_selection_skips_fetch() {
        let fetcher = Arc::new(StaticFetcher::new());
        let r = resolver(fetcher.clone());
        r.selections().set("tok", CloudId::new("pinned"));

        let result = r.resolve_cloud_id(&AccessToken::new("tok")).await.unwrap();
        assert_eq!(result, ResolveResult::Resolved { cloud_id: CloudId::new("pinned") });
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let fetcher = Arc::new(StaticFetcher::new());
        let r = resolver(fetcher);

        let err = r.resolve_cloud_id(&AccessToken::new("unknown")).await.unwrap_err();
        assert!(matches!(err, AuthError::UpstreamFetch(_)));
    }

    #[tokio::test]
    async fn test_select_site_pins_choice() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![site("a"), site("b")]));
        let r = resolver(fetcher);
        let token = AccessToken::new("tok");

        let chosen = r.select_site(&token, &CloudId::new("b")).await.unwrap();
        assert_eq!(chosen.id.as_str(), "b");

        let result = r.resolve_cloud_id(&token).await.unwrap();
        assert_eq!(result, ResolveResult::Resolved { cloud_id: CloudId::new("b") });
    }

    #[tokio::test]
    async fn test_select_unknown_site_fails() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![site("a"), site("b")]));
        let r = resolver(fetcher);

        let err = r
            .select_site(&AccessToken::new("tok"), &CloudId::new("zzz"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownSite(id) if id.as_str() == "zzz"));
        assert!(r.selections().is_empty());
    }

    #[tokio::test]
    async fn test_forget_clears_selection() {
        let fetcher = Arc::new(StaticFetcher::new().with("tok", vec![site("a"), site("b")]));
        let r = resolver(fetcher);
        let token = AccessToken::new("tok");

        r.select_site(&token, &CloudId::new("a")).await.unwrap();
        assert_eq!(r.forget(&token), Some(CloudId::new("a")));
        assert!(matches!(
            r.resolve_cloud_id(&token).await.unwrap(),
            ResolveResult::Unresolved { .. }
        ));
    }

    #[test]
    fn test_resolve_result_serialization() {
        let resolved = ResolveResult::Resolved { cloud_id: CloudId::new("a") };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["cloudId"], "a");

        let unresolved = ResolveResult::Unresolved { sites: vec![site("a")] };
        let json = serde_json::to_value(&unresolved).unwrap();
        assert_eq!(json["status"], "unresolved");
        assert_eq!(json["sites"][0]["id"], "a");
    }
}
