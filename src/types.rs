//! NewType wrappers for strong typing throughout the server.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing an access token where a cloud ID is expected).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Atlassian cloud ID identifying one Jira Cloud site.
    ///
    /// Opaque to us; it is only ever copied out of the accessible-resources
    /// response or supplied by the caller via the cloud ID header.
    CloudId
);

/// OAuth bearer token presented by the caller.
///
/// Not `Display`/`Serialize`. The raw value only leaves this
/// type through [`AccessToken::expose`], and `Debug` prints a fingerprint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value, for outgoing `Authorization` headers and cache keys.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix used to correlate log lines without leaking the token.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        format!("{:x}", digest)[..12].to_string()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({})", self.fingerprint())
    }
}
