//! Claim set carried by access tokens.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Decoded token payload.
///
/// Only the fields the gate cares about are modelled; everything else in the
/// payload is ignored. `exp` and `nbf` are checked by `jsonwebtoken` during
/// decoding and are kept here for diagnostics.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Granted scopes. Anything other than an array of strings decodes as
    /// no scopes at all.
    #[serde(default, deserialize_with = "lenient_scope")]
    pub scope: Vec<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Claims {
    /// Check if the token grants `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeShape {
    List(Vec<String>),
    Other(IgnoredAny),
}

fn lenient_scope<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ScopeShape::deserialize(deserializer)? {
        ScopeShape::List(scopes) => scopes,
        ScopeShape::Other(_) => Vec::new(),
    })
}
