//! Health check and root-administrator bootstrap.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use medrec_infra::ensure_root_user;

use crate::app::{errors, AppServices};

/// GET /api/status - liveness probe, public.
pub async fn status() -> Response {
    Json(json!({ "status": "healthy", "version": "1.0.0" })).into_response()
}

/// POST /api/ensure-root - verify/create the bootstrap administrator.
///
/// Idempotent. The response carries a token minted through the fixed
/// bootstrap issuance path (always an `administrator` claim shape, never an
/// `admin_id`), regardless of the stored account's role.
pub async fn ensure_root(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let Some(root) = services.root_user.as_ref() else {
        return errors::detail_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Root user is not configured",
        );
    };

    let (record, created) = match ensure_root_user(services.users.as_ref(), root).await {
        Ok(result) => result,
        Err(e) => return errors::store_error("root user setup", &e),
    };

    let token = match services
        .codec
        .issue_bootstrap_admin(record.id, &record.full_name, &record.email)
    {
        Ok(token) => token,
        Err(e) => return errors::detail_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let message = if created {
        "Root administrator user created"
    } else {
        "Root administrator user already exists"
    };

    let mut extra = serde_json::Map::new();
    extra.insert("user_id".into(), json!(record.id));
    extra.insert("token".into(), json!(token));
    errors::detail_ok(StatusCode::OK, message, extra)
}
