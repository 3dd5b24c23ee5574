//! Credential handling and Jira Cloud site resolution.
//!
//! Every tool call needs two things: the caller's OAuth bearer token and the
//! cloud ID of the Jira site to talk to. This module supplies both:
//!
//! - **Extraction**: `CredentialExtractor` turns request headers (or the
//!   configured stdio defaults) into a `CredentialBundle`
//! - **Resolution**: `SiteResolver` maps a token to a cloud ID, asking the
//!   caller to choose when the token reaches several sites
//! - **Caching**: two `TtlCache`s remember accessible-resource lists (short
//!   TTL) and site selections (long TTL) per token
//! - **Request scope**: `with_request_auth` installs the bundle in a
//!   task-local for the duration of one tool call
//!
//! ## Usage
//!
//! ```ignore
//! let bundle = extractor.extract(Some(&parts.headers))?;
//! let result = with_request_auth(bundle, async {
//!     let cloud_id = require_cloud_id(&resolver).await?;
//!     // call Jira with cloud_id
//! }).await;
//! ```

pub mod cache;
mod context;
mod extractor;
mod resolver;
mod resources;

pub use cache::TtlCache;
pub use context::{
    CredentialBundle, current_auth, require_access_token, require_cloud_id, set_current_auth,
    set_current_cloud_id, with_request_auth,
};
pub use extractor::{AuthConfig, AuthError, CredentialExtractor, DEFAULT_CLOUD_ID_HEADER};
pub use resolver::{ResolveResult, SiteResolver};
#[cfg(test)]
pub(crate) use resources::testing;
pub use resources::{
    DEFAULT_ACCESSIBLE_RESOURCES_URL, HttpResourceFetcher, ResourceFetcher, ResourceResolver, Site,
};
