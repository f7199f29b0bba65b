//! Required scopes for a protected endpoint.

use crate::claims::Claims;
use std::collections::HashSet;

/// Scopes a token must carry, AND-combined.
///
/// Order is irrelevant and duplicates are harmless. An empty set is
/// satisfied by any validly signed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredScopes(Vec<String>);

impl RequiredScopes {
    /// No scope requirement.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The required scope names, as given.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First required scope absent from `claims`, or `None` when every
    /// requirement is met.
    pub fn first_missing(&self, claims: &Claims) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }

        let granted: HashSet<&str> = claims.scope.iter().map(String::as_str).collect();
        self.0
            .iter()
            .map(String::as_str)
            .find(|required| !granted.contains(required))
    }
}

impl From<Vec<String>> for RequiredScopes {
    fn from(scopes: Vec<String>) -> Self {
        Self(scopes)
    }
}

impl From<&[&str]> for RequiredScopes {
    fn from(scopes: &[&str]) -> Self {
        scopes.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for RequiredScopes {
    fn from(scopes: [&str; N]) -> Self {
        scopes.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RequiredScopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(scopes: &[&str]) -> Claims {
        Claims {
            scope: scopes.iter().map(ToString::to_string).collect(),
            ..Claims::default()
        }
    }

    #[test]
    fn test_empty_requirement_always_satisfied() {
        assert_eq!(RequiredScopes::none().first_missing(&Claims::default()), None);
        assert_eq!(
            RequiredScopes::none().first_missing(&claims_with(&["admin"])),
            None
        );
    }

    #[test]
    fn test_exact_match_satisfied() {
        let required = RequiredScopes::from(["admin", "user"]);
        assert_eq!(required.first_missing(&claims_with(&["admin", "user"])), None);
    }

    #[test]
    fn test_superset_satisfied() {
        let required = RequiredScopes::from(["user"]);
        assert_eq!(
            required.first_missing(&claims_with(&["admin", "user", "billing"])),
            None
        );
    }

    #[test]
    fn test_order_is_irrelevant() {
        let required = RequiredScopes::from(["user", "admin"]);
        assert_eq!(required.first_missing(&claims_with(&["admin", "user"])), None);
    }

    #[test]
    fn test_duplicates_are_harmless() {
        let required = RequiredScopes::from(["admin", "admin"]);
        assert_eq!(required.first_missing(&claims_with(&["admin"])), None);
    }

    #[test]
    fn test_one_missing_scope_reported() {
        let required = RequiredScopes::from(["admin", "user", "billing"]);
        assert_eq!(
            required.first_missing(&claims_with(&["admin", "user"])),
            Some("billing")
        );
    }

    #[test]
    fn test_no_granted_scopes() {
        let required = RequiredScopes::from(["admin"]);
        assert_eq!(required.first_missing(&Claims::default()), Some("admin"));
    }

    #[test]
    fn test_scope_names_are_case_sensitive() {
        let required = RequiredScopes::from(["Admin"]);
        assert_eq!(required.first_missing(&claims_with(&["admin"])), Some("Admin"));
    }

    #[test]
    fn test_constructors_agree() {
        let from_array = RequiredScopes::from(["a", "b"]);
        let from_slice = RequiredScopes::from(&["a", "b"][..]);
        let from_vec = RequiredScopes::from(vec!["a".to_string(), "b".to_string()]);
        let collected: RequiredScopes = vec!["a", "b"].into_iter().collect();

        assert_eq!(from_array, from_slice);
        assert_eq!(from_slice, from_vec);
        assert_eq!(from_vec, collected);
        assert_eq!(from_array.as_slice(), ["a", "b"]);
    }
}
