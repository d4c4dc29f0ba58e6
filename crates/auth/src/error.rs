//! Authentication/authorization error taxonomy.
//!
//! Authentication errors always surface before authorization errors: a
//! caller never learns a permission reason before proving identity. Every
//! rejection carries a fixed, human-readable message that is part of the
//! contract (clients and tests key off the exact wording), attached to the
//! variant as data and mapped to a transport response at a single boundary
//! point in the API layer.

use thiserror::Error;

use crate::TokenError;

/// The caller failed to prove identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthnError {
    /// No `api_key` header at all.
    #[error("API Key is required")]
    MissingApiKey,

    /// An `api_key` header was present but did not match.
    #[error("Invalid API Key")]
    BadApiKey,

    /// No `Authorization` header on a non-public route.
    #[error("Authorization token is required")]
    MissingToken,

    /// The `Authorization` header could not be read as a bearer token.
    #[error("Invalid Authorization header format. Use 'Bearer <token>'")]
    MalformedAuthHeader,

    /// Token decode failure (expired, malformed or bad signature; the
    /// nested kind stays distinguishable in logs and tests).
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthnError {
    /// Transport status for this failure.
    ///
    /// A missing API key is a malformed request (400); a wrong one is a
    /// refusal (403). Token problems are authentication failures (401).
    pub fn status_code(&self) -> u16 {
        match self {
            AuthnError::MissingApiKey => 400,
            AuthnError::BadApiKey => 403,
            AuthnError::MissingToken
            | AuthnError::MalformedAuthHeader
            | AuthnError::Token(_) => 401,
        }
    }
}

/// The caller is authenticated but not permitted.
///
/// Always maps to a 403 response; the variant records which rule denied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Route-level role check failed.
    #[error("{0}")]
    WrongRole(&'static str),

    /// The caller's resolved scope does not cover the requested data.
    #[error("{0}")]
    WrongScope(&'static str),

    /// A fetched resource belongs to someone outside the caller's reach.
    #[error("{0}")]
    NotOwner(&'static str),

    /// The operation may not target the caller's own account.
    #[error("User cannot delete itself")]
    SelfActionForbidden,
}

impl AuthzError {
    pub fn status_code(&self) -> u16 {
        403
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_statuses() {
        assert_eq!(AuthnError::MissingApiKey.status_code(), 400);
        assert_eq!(AuthnError::BadApiKey.status_code(), 403);
    }

    #[test]
    fn token_failures_are_unauthorized() {
        assert_eq!(AuthnError::MissingToken.status_code(), 401);
        assert_eq!(AuthnError::Token(TokenError::Expired).status_code(), 401);
        assert_eq!(
            AuthnError::Token(TokenError::Expired).to_string(),
            "Token has expired"
        );
    }

    #[test]
    fn self_action_message_is_fixed() {
        assert_eq!(
            AuthzError::SelfActionForbidden.to_string(),
            "User cannot delete itself"
        );
    }
}
