//! The single transport boundary for error mapping.
//!
//! Every rejection body has the shape
//! `{"detail": {"message": <fixed reason>, "status_code": N}}`, with the
//! status duplicated inside the body as well as used as the transport
//! status. The message strings themselves live on the error variants in
//! `medrec-auth` and `medrec-core`; nothing is re-derived here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use medrec_auth::{AuthnError, AuthzError};
use medrec_core::DomainError;
use medrec_infra::StoreError;

/// Build a `{"detail": {...}}` error response.
pub fn detail_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "detail": {
                "message": message.into(),
                "status_code": status.as_u16(),
            }
        })),
    )
        .into_response()
}

/// Build a `{"detail": {...}}` success response with extra fields.
pub fn detail_ok(
    status: StatusCode,
    message: &str,
    extra: serde_json::Map<String, serde_json::Value>,
) -> Response {
    let mut detail = serde_json::Map::new();
    detail.insert("message".into(), json!(message));
    for (key, value) in extra {
        detail.insert(key, value);
    }
    detail.insert("status_code".into(), json!(status.as_u16()));
    (status, axum::Json(json!({ "detail": detail }))).into_response()
}

pub fn authn_error(e: &AuthnError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
    detail_error(status, e.to_string())
}

pub fn authz_error(e: &AuthzError) -> Response {
    detail_error(StatusCode::FORBIDDEN, e.to_string())
}

pub fn domain_error(status: StatusCode, e: &DomainError) -> Response {
    detail_error(status, e.to_string())
}

/// Storage failures surface as opaque 500s (conflicts are mapped explicitly
/// by handlers before reaching this).
pub fn store_error(operation: &str, e: &StoreError) -> Response {
    tracing::error!(operation, error = %e, "storage failure");
    detail_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error during {operation}"),
    )
}
