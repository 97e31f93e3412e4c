//! Acting-user resolution.
//!
//! Every request carries up to two identities: one the caller claims (a
//! `user_id` field or header) and one established by the fronting auth
//! layer. [`resolve_actor`] reduces them to the single [`UserId`] all
//! ownership checks compare against.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DomainError, Result};

/// Identifier of the acting user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::ops::Deref for UserId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl rusqlite::ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

/// Resolve the acting user from a claimed and an authenticated identity.
///
/// - authenticated and a different claim: [`DomainError::IdentityMismatch`]
/// - authenticated: the session identity
/// - unauthenticated with a claim: the claim (trusted internal callers)
/// - neither: [`DomainError::IdentityRequired`]
///
/// Blank strings count as absent.
pub fn resolve_actor(claimed: Option<&str>, authenticated: Option<&str>) -> Result<UserId> {
    let claimed = claimed.map(str::trim).filter(|s| !s.is_empty());
    let authenticated = authenticated.map(str::trim).filter(|s| !s.is_empty());

    match (claimed, authenticated) {
        (Some(claim), Some(session)) if claim != session => Err(DomainError::IdentityMismatch),
        (_, Some(session)) => Ok(UserId::from(session)),
        (Some(claim), None) => Ok(UserId::from(claim)),
        (None, None) => Err(DomainError::IdentityRequired),
    }
}

/// [`resolve_actor`] over several claims for the same request.
///
/// Every non-blank claim must name the same user; the agreed claim is then
/// checked against the session as usual.
pub fn resolve_claims<'a>(
    claims: impl IntoIterator<Item = Option<&'a str>>,
    authenticated: Option<&str>,
) -> Result<UserId> {
    let mut agreed: Option<&str> = None;
    for claim in claims.into_iter().flatten().map(str::trim).filter(|s| !s.is_empty()) {
        match agreed {
            Some(first) if first != claim => return Err(DomainError::IdentityMismatch),
            Some(_) => {}
            None => agreed = Some(claim),
        }
    }
    resolve_actor(agreed, authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn session_identity_wins_when_no_claim() {
        let user = resolve_actor(None, Some("u1")).unwrap();
        assert_eq!(user.as_str(), "u1");
    }

    #[test]
    fn matching_claim_is_accepted() {
        let user = resolve_actor(Some("u1"), Some("u1")).unwrap();
        assert_eq!(user.as_str(), "u1");
    }

    #[test]
    fn conflicting_claim_is_rejected() {
        assert_matches!(
            resolve_actor(Some("u2"), Some("u1")),
            Err(DomainError::IdentityMismatch)
        );
    }

    #[test]
    fn unauthenticated_claim_is_trusted() {
        let user = resolve_actor(Some("u9"), None).unwrap();
        assert_eq!(user.as_str(), "u9");
    }

    #[test]
    fn no_identity_is_rejected() {
        assert_matches!(resolve_actor(None, None), Err(DomainError::IdentityRequired));
    }

    #[test]
    fn blank_values_count_as_absent() {
        assert_matches!(
            resolve_actor(Some("  "), Some("")),
            Err(DomainError::IdentityRequired)
        );
        let user = resolve_actor(Some(""), Some("u1")).unwrap();
        assert_eq!(user.as_str(), "u1");
    }

    #[test]
    fn every_claim_is_checked_against_the_session() {
        assert_matches!(
            resolve_claims([Some("alice"), None, Some("mallory")], Some("alice")),
            Err(DomainError::IdentityMismatch)
        );
        let user = resolve_claims([None, Some("alice"), Some(" alice ")], Some("alice")).unwrap();
        assert_eq!(user.as_str(), "alice");
    }

    #[test]
    fn disagreeing_claims_without_session_are_rejected() {
        assert_matches!(
            resolve_claims([Some("alice"), Some("bob")], None),
            Err(DomainError::IdentityMismatch)
        );
        assert_matches!(resolve_claims([None, Some("")], None), Err(DomainError::IdentityRequired));
    }
}
