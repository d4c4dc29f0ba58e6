//! Request authorization middleware.
//!
//! Per-request ordered pipeline: static API key, public-route short-circuit,
//! bearer-token decode, route classification, role/scope resolution, context
//! injection. The ordering is strict: a request with a bad API key never
//! learns whether its token was valid, and no step runs before the previous
//! one succeeded. No persistence I/O happens here.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use medrec_auth::{resolve, AuthConfig, AuthnError, RouteClass, TokenCodec};

use crate::app::errors;
use crate::context::AuthContext;

/// Shared middleware state: configuration plus the token codec, both built
/// once at startup.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AuthConfig>,
    pub codec: Arc<TokenCodec>,
}

impl AuthState {
    pub fn new(config: Arc<AuthConfig>, codec: Arc<TokenCodec>) -> Self {
        Self { config, codec }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Step 1: static API key, before anything else.
    if let Err(e) = verify_api_key(req.headers(), &state.config) {
        tracing::warn!(error = %e, "request rejected by API key check");
        return errors::authn_error(&e);
    }

    // Step 2: public routes stop here, API key only.
    let route = RouteClass::classify(req.uri().path());
    if route == RouteClass::Public {
        return next.run(req).await;
    }

    // Step 3: require and decode the bearer token.
    let principal = match extract_bearer(req.headers()).and_then(|token| {
        state
            .codec
            .decode(token)
            .map_err(AuthnError::Token)
    }) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::warn!(error = %e, path = req.uri().path(), "request rejected by token check");
            return errors::authn_error(&e);
        }
    };

    // Steps 4–5: role/route decision and scope resolution.
    let scope = match resolve(&principal, route) {
        Ok(scope) => scope,
        Err(e) => {
            tracing::warn!(
                user_id = %principal.id,
                path = req.uri().path(),
                error = %e,
                "request rejected by role check"
            );
            return errors::authz_error(&e);
        }
    };

    // Step 6: hand the resolved identity to the handler.
    req.extensions_mut()
        .insert(AuthContext::new(principal, scope));

    next.run(req).await
}

fn verify_api_key(headers: &HeaderMap, config: &AuthConfig) -> Result<(), AuthnError> {
    let value = headers.get("api_key").ok_or(AuthnError::MissingApiKey)?;
    match value.to_str() {
        Ok(presented) if presented == config.api_key => Ok(()),
        _ => Err(AuthnError::BadApiKey),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthnError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthnError::MissingToken)?;

    let header = header
        .to_str()
        .map_err(|_| AuthnError::MalformedAuthHeader)?;

    // The original clients send both `Bearer <token>` and the bare token.
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err(AuthnError::MalformedAuthHeader);
    }

    Ok(token)
}
