//! Signed identity-token codec (HMAC-SHA256).
//!
//! Encodes a [`Principal`] plus an expiry instant into an opaque bearer
//! string and verifies/decodes it back. This module knows nothing about HTTP
//! or storage; the secret is injected once via [`AuthConfig`] and treated as
//! immutable for the process lifetime.
//!
//! Expiry is strict: a token is invalid exactly at its boundary instant
//! (`now >= exp`). The jsonwebtoken built-in expiry check is bypassed because
//! it applies leeway and `exp < now` semantics; the comparison is done here
//! so the boundary is locally enforced and testable.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medrec_core::UserId;

use crate::{AuthConfig, Principal, Role};

/// Claim set signed inside every identity token.
///
/// `admin_id` is serialized only when present — omission is meaningful
/// (non-professional callers never carry the field) and round-trip-tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub profile: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<UserId>,
    /// Expiry as Unix seconds.
    pub exp: i64,
}

/// Token verification/issuance failure.
///
/// All three kinds are treated identically by callers (authentication
/// failure) but stay distinguishable for logs and tests. The display strings
/// are part of the wire contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Malformed(String),

    #[error("Invalid token: signature mismatch")]
    BadSignature,
}

/// Issues and verifies signed identity tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            default_ttl: config.token_ttl(),
        }
    }

    /// Issue a token for a principal with an explicit lifetime.
    ///
    /// The `admin_id` claim is emitted only when the principal is a
    /// professional with a linked administrator; for every other role the
    /// field is omitted entirely (never null/empty).
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, TokenError> {
        let admin_id = match principal.role {
            Role::Professional => principal.admin_id,
            _ => None,
        };

        let claims = Claims {
            user_id: principal.id,
            full_name: principal.full_name.clone(),
            email: principal.email.clone(),
            profile: principal.role,
            admin_id,
            exp: (Utc::now() + ttl).timestamp(),
        };

        self.encode(&claims)
    }

    /// Issue a token with the configured default lifetime (24h unless
    /// overridden in [`AuthConfig`]).
    pub fn issue_with_default_ttl(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue(principal, self.default_ttl)
    }

    /// Fixed, narrower issuance path used when provisioning a bootstrap
    /// administrator account.
    ///
    /// Always sets `profile = administrator` and never carries `admin_id`,
    /// regardless of what the underlying account stores.
    pub fn issue_bootstrap_admin(
        &self,
        user_id: UserId,
        full_name: &str,
        email: &str,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            full_name: full_name.to_string(),
            email: email.to_string(),
            profile: Role::Administrator,
            admin_id: None,
            exp: (Utc::now() + self.default_ttl).timestamp(),
        };

        self.encode(&claims)
    }

    /// Verify the signature, parse the claims and reconstruct the principal.
    ///
    /// Fails with [`TokenError::Expired`] when `now >= exp`, with
    /// [`TokenError::BadSignature`] on MAC mismatch and with
    /// [`TokenError::Malformed`] when the structure cannot be parsed.
    pub fn decode(&self, token: &str) -> Result<Principal, TokenError> {
        // Expiry is checked explicitly below; disable the library's leeway'd
        // check and its implied required-claim set.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        let claims = data.claims;
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(Principal {
            id: claims.user_id,
            full_name: claims.full_name,
            email: claims.email,
            role: claims.profile,
            admin_id: claims.admin_id,
        })
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use proptest::prelude::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig::new("test-secret", "test-api-key"))
    }

    fn professional(admin_id: Option<UserId>) -> Principal {
        Principal::new(
            UserId::new(),
            "Rita Gomes",
            "rita@example.com",
            Role::Professional,
            admin_id,
        )
    }

    /// Decode the payload segment without verifying, to inspect the raw JSON.
    fn raw_payload(token: &str) -> serde_json::Value {
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let codec = codec();
        let admin = UserId::new();
        let p = professional(Some(admin));

        let token = codec.issue(&p, Duration::minutes(10)).unwrap();
        let decoded = codec.decode(&token).unwrap();

        assert_eq!(decoded, p);
    }

    #[test]
    fn admin_id_claim_is_omitted_for_administrators() {
        let codec = codec();
        let p = Principal::new(
            UserId::new(),
            "Ana Souza",
            "ana@example.com",
            Role::Administrator,
            None,
        );

        let token = codec.issue(&p, Duration::minutes(10)).unwrap();
        let payload = raw_payload(&token);

        // Omitted entirely, not serialized as null.
        assert!(payload.get("admin_id").is_none());
        assert_eq!(payload["profile"], "administrator");
    }

    #[test]
    fn admin_id_claim_is_present_for_linked_professionals() {
        let codec = codec();
        let admin = UserId::new();
        let token = codec
            .issue(&professional(Some(admin)), Duration::minutes(10))
            .unwrap();

        let payload = raw_payload(&token);
        assert_eq!(payload["admin_id"], admin.to_string());
    }

    #[test]
    fn zero_ttl_token_is_already_expired() {
        let codec = codec();
        let token = codec
            .issue(&professional(Some(UserId::new())), Duration::zero())
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn negative_ttl_token_is_expired() {
        let codec = codec();
        let token = codec
            .issue(&professional(Some(UserId::new())), Duration::minutes(-5))
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_rejected_as_bad_signature() {
        let codec = codec();
        let token = codec
            .issue(&professional(Some(UserId::new())), Duration::minutes(10))
            .unwrap();

        // Flip the last character of the signature segment.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(codec.decode(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let codec = codec();
        let other = TokenCodec::new(&AuthConfig::new("other-secret", "test-api-key"));
        let token = other
            .issue(&professional(Some(UserId::new())), Duration::minutes(10))
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_rejected_as_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.decode("not-a-token"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn error_messages_match_the_wire_contract() {
        assert_eq!(TokenError::Expired.to_string(), "Token has expired");
        assert_eq!(
            TokenError::Malformed("InvalidToken".into()).to_string(),
            "Invalid token: InvalidToken"
        );
        assert!(TokenError::BadSignature.to_string().starts_with("Invalid token:"));
    }

    #[test]
    fn bootstrap_admin_token_always_carries_administrator_profile() {
        let codec = codec();
        let user_id = UserId::new();

        // The underlying account's stored role is irrelevant here: the
        // bootstrap path fixes the claim shape at issuance.
        let token = codec
            .issue_bootstrap_admin(user_id, "Root Admin", "root@example.com")
            .unwrap();
        let decoded = codec.decode(&token).unwrap();

        assert_eq!(decoded.role, Role::Administrator);
        assert_eq!(decoded.admin_id, None);
        assert_eq!(decoded.id, user_id);

        let payload = raw_payload(&token);
        assert!(payload.get("admin_id").is_none());

        // Admin-level routes resolve to the bootstrap account's own subtree.
        assert_eq!(
            crate::resolve(&decoded, crate::RouteClass::AdminOnly),
            Ok(crate::TenantScope::RestrictedToAdmin(user_id))
        );
    }

    proptest! {
        /// For all valid principals and positive lifetimes, decode(issue(p))
        /// returns a principal equal to p in every field, and admin_id is
        /// present iff the role is professional and a link was supplied.
        #[test]
        fn round_trip_property(
            full_name in "[A-Za-z ]{1,40}",
            email in "[a-z]{1,12}@[a-z]{1,8}\\.com",
            role_idx in 0usize..3,
            with_admin in proptest::bool::ANY,
            ttl_minutes in 1i64..10_000,
        ) {
            let role = [
                Role::GeneralAdministrator,
                Role::Administrator,
                Role::Professional,
            ][role_idx];

            let admin_id = with_admin.then(UserId::new);
            let p = Principal::new(UserId::new(), full_name, email, role, admin_id);

            let codec = codec();
            let token = codec.issue(&p, Duration::minutes(ttl_minutes)).unwrap();
            let decoded = codec.decode(&token).unwrap();

            prop_assert_eq!(&decoded, &p);
            prop_assert_eq!(
                decoded.admin_id.is_some(),
                role == Role::Professional && with_admin
            );
        }
    }
}
