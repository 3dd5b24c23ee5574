//! Request-scoped credentials.
//!
//! Each inbound tool call runs inside [`with_request_auth`], which installs
//! the call's [`CredentialBundle`] in a tokio task-local. Tool code reads it
//! with [`current_auth`] or [`require_cloud_id`]; concurrent calls each see
//! only their own bundle, and the slot disappears when the call's future
//! completes.

use std::cell::RefCell;
use std::future::Future;

use tracing::{debug, warn};

use crate::auth::extractor::AuthError;
use crate::auth::resolver::{ResolveResult, SiteResolver};
use crate::types::{AccessToken, CloudId};

/// Credentials for one inbound request.
///
/// The token is fixed at creation; the cloud ID may be filled in once site
/// resolution succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    access_token: AccessToken,
    cloud_id: Option<CloudId>,
}

impl CredentialBundle {
    /// Create a new bundle.
    pub fn new(access_token: AccessToken, cloud_id: Option<CloudId>) -> Self {
        Self {
            access_token,
            cloud_id,
        }
    }

    /// Get the bearer token.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Get the cloud ID, if known.
    pub fn cloud_id(&self) -> Option<&CloudId> {
        self.cloud_id.as_ref()
    }

    /// Return a copy with the cloud ID set.
    pub fn with_cloud_id(mut self, cloud_id: CloudId) -> Self {
        self.cloud_id = Some(cloud_id);
        self
    }
}

tokio::task_local! {
    static CURRENT_AUTH: RefCell<Option<CredentialBundle>>;
}

/// Run `fut` with `bundle` as the current request's credentials.
///
/// The slot is released when `fut` finishes, whether it returns, errors or
/// panics.
pub async fn with_request_auth<F>(bundle: CredentialBundle, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_AUTH.scope(RefCell::new(Some(bundle)), fut).await
}

/// Replace the current request's credentials.
///
/// Fails with `NoRequestScope` when called outside [`with_request_auth`].
pub fn set_current_auth(bundle: Option<CredentialBundle>) -> Result<(), AuthError> {
    CURRENT_AUTH
        .try_with(|slot| *slot.borrow_mut() = bundle)
        .map_err(|_| AuthError::NoRequestScope)
}

/// Credentials of the current request, or `None` outside a request scope.
pub fn current_auth() -> Option<CredentialBundle> {
    CURRENT_AUTH
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Record a resolved cloud ID on the current request's bundle.
pub fn set_current_cloud_id(cloud_id: CloudId) -> Result<(), AuthError> {
    CURRENT_AUTH
        .try_with(|slot| match slot.borrow_mut().as_mut() {
            Some(bundle) => {
                bundle.cloud_id = Some(cloud_id);
                Ok(())
            }
            None => Err(AuthError::NoCredentials),
        })
        .map_err(|_| AuthError::NoRequestScope)?
}

/// Bearer token of the current request.
pub fn require_access_token() -> Result<AccessToken, AuthError> {
    current_auth()
        .map(|bundle| bundle.access_token)
        .ok_or(AuthError::NoCredentials)
}

/// Cloud ID for the current request, resolving it from the token if needed.
///
/// An explicit cloud ID on the bundle is returned as-is. Otherwise the
/// resolver runs; a single accessible site is recorded on the bundle, and
/// several sites yield `AmbiguousSite` listing the candidates.
pub async fn require_cloud_id(resolver: &SiteResolver) -> Result<CloudId, AuthError> {
    let bundle = current_auth().ok_or(AuthError::NoCredentials)?;

    if let Some(cloud_id) = bundle.cloud_id {
        return Ok(cloud_id);
    }

    match resolver.resolve_cloud_id(&bundle.access_token).await? {
        ResolveResult::Resolved { cloud_id } => {
            if let Err(e) = set_current_cloud_id(cloud_id.clone()) {
                warn!("Could not record resolved cloud ID on request: {}", e);
            }
            Ok(cloud_id)
        }
        ResolveResult::Unresolved { sites } => {
            debug!(
                token = %bundle.access_token.fingerprint(),
                candidates = sites.len(),
                "Site selection required"
            );
            Err(AuthError::AmbiguousSite(sites))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bundle(token: &str) -> CredentialBundle {
        CredentialBundle::new(AccessToken::new(token), None)
    }

    #[tokio::test]
    async fn test_set_then_get_returns_bundle() {
        with_request_auth(bundle("tok-1"), async {
            let b = bundle("tok-2").with_cloud_id(CloudId::new("site-A"));
            set_current_auth(Some(b.clone())).unwrap();
            assert_eq!(current_auth(), Some(b));

            set_current_auth(None).unwrap();
            assert_eq!(current_auth(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_scope_exposes_initial_bundle() {
        let seen = with_request_auth(bundle("tok-1"), async { current_auth() }).await;
        assert_eq!(seen, Some(bundle("tok-1")));
    }

    #[tokio::test]
    async fn test_outside_scope() {
        assert_eq!(current_auth(), None);
        assert!(matches!(
            set_current_auth(Some(bundle("tok"))),
            Err(AuthError::NoRequestScope)
        ));
        assert!(matches!(require_access_token(), Err(AuthError::NoCredentials)));
    }

    #[tokio::test]
    async fn test_slot_released_after_scope() {
        with_request_auth(bundle("tok-1"), async {}).await;
        assert_eq!(current_auth(), None);
    }

    #[tokio::test]
    async fn test_slot_released_after_error() {
        let result: Result<(), AuthError> =
            with_request_auth(bundle("tok-1"), async { Err(AuthError::NoAccessibleSites) }).await;
        assert!(result.is_err());
        assert_eq!(current_auth(), None);
    }

    #[tokio::test]
    async fn test_set_current_cloud_id() {
        with_request_auth(bundle("tok-1"), async {
            set_current_cloud_id(CloudId::new("site-A")).unwrap();
            let current = current_auth().unwrap();
            assert_eq!(current.cloud_id().map(|c| c.as_str()), Some("site-A"));
            assert_eq!(current.access_token().expose(), "tok-1");
        })
        .await;
    }

    #[tokio::test]
    async fn test_set_cloud_id_on_cleared_slot_fails() {
        with_request_auth(bundle("tok-1"), async {
            set_current_auth(None).unwrap();
            assert!(matches!(
                set_current_cloud_id(CloudId::new("site-A")),
                Err(AuthError::NoCredentials)
            ));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_do_not_share_credentials() {
        let mut handles = Vec::new();
        for i in 0..16 {
            handles.push(tokio::spawn(async move {
                let token = format!("tok-{}", i);
                with_request_auth(bundle(&token), async move {
                    for _ in 0..5 {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        let current = current_auth().unwrap();
                        assert_eq!(current.access_token().expose(), token);
                    }
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_interleaved_requests_on_one_task() {
        // Two logical requests polled by the same task still keep their own slot.
        let a = with_request_auth(bundle("tok-A"), async {
            tokio::task::yield_now().await;
            current_auth().map(|b| b.access_token().expose().to_string())
        });
        let b = with_request_auth(bundle("tok-B"), async {
            tokio::task::yield_now().await;
            current_auth().map(|b| b.access_token().expose().to_string())
        });

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.as_deref(), Some("tok-A"));
        assert_eq!(b.as_deref(), Some("tok-B"));
    }
}
