//! Health-unit routes.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use medrec_auth::scope::{ensure_administrative, reasons};
use medrec_auth::{verify_ownership, OwnedResourceRef, TenantScope};
use medrec_core::{HealthUnitId, UserId};
use medrec_infra::{HealthUnitPatch, NewHealthUnit, UserStatus};

use crate::app::dto::{CreateHealthUnitRequest, UpdateHealthUnitRequest};
use crate::app::{errors, AppServices};
use crate::context::AuthContext;

fn parse_unit_id(raw: &str) -> Result<HealthUnitId, Response> {
    raw.parse::<HealthUnitId>()
        .map_err(|_| errors::detail_error(StatusCode::BAD_REQUEST, "Invalid health unit ID"))
}

/// POST /api/health-units/create - create a unit under an administrator.
///
/// The route class restricts this to administrator tiers; a restricted
/// caller always owns the new unit, the general administrator names the
/// owning administrator explicitly.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateHealthUnitRequest>,
) -> Response {
    let admin_id = match ctx.scope {
        TenantScope::Unrestricted => {
            let Some(raw) = body.admin_id.as_deref() else {
                return errors::detail_error(
                    StatusCode::BAD_REQUEST,
                    "Error adding health unit: admin_id cannot be empty",
                );
            };
            match raw.parse::<UserId>() {
                Ok(admin_id) => admin_id,
                Err(_) => {
                    return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid admin ID");
                }
            }
        }
        // Restricted callers create units in their own subtree only.
        TenantScope::RestrictedToAdmin(admin_id)
        | TenantScope::RestrictedToAdminAndProfessional(admin_id, _) => admin_id,
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::HealthUnit { admin_id },
    ) {
        return errors::authz_error(&e);
    }

    match services.users.get_user_by_id(admin_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Admin not found"),
        Err(e) => return errors::store_error("adding health unit", &e),
    }

    for (field, value) in [("name", &body.name), ("cnpj", &body.cnpj)] {
        if value.trim().is_empty() {
            return errors::detail_error(
                StatusCode::BAD_REQUEST,
                format!("Error adding health unit: {field} cannot be empty"),
            );
        }
    }

    let status = match body.status.as_deref() {
        None => UserStatus::Active,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => status,
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    match services
        .health_units
        .add_health_unit(NewHealthUnit {
            admin_id,
            name: body.name.trim().to_string(),
            cnpj: body.cnpj.trim().to_string(),
            status,
        })
        .await
    {
        Ok(record) => {
            let mut extra = serde_json::Map::new();
            extra.insert("unit_id".into(), json!(record.id));
            errors::detail_ok(StatusCode::CREATED, "Health unit added successfully", extra)
        }
        Err(e) => errors::store_error("adding health unit", &e),
    }
}

/// GET /api/health-units/list - units in the caller's subtree.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    match services
        .health_units
        .list_health_units(&ctx.subtree_scope())
        .await
    {
        Ok(units) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(units.len()));
            extra.insert("health_units".into(), json!(units));
            errors::detail_ok(
                StatusCode::OK,
                "Health units retrieved successfully",
                extra,
            )
        }
        Err(e) => errors::store_error("retrieving health units", &e),
    }
}

/// GET /api/health-units/:id
pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let unit_id = match parse_unit_id(&id) {
        Ok(unit_id) => unit_id,
        Err(response) => return response,
    };

    let unit = match services.health_units.get_health_unit(unit_id).await {
        Ok(Some(unit)) => unit,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => return errors::store_error("retrieving health unit", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::HealthUnit {
            admin_id: unit.admin_id,
        },
    ) {
        return errors::authz_error(&e);
    }

    let mut extra = serde_json::Map::new();
    extra.insert("health_unit".into(), json!(unit));
    errors::detail_ok(StatusCode::OK, "Health unit retrieved successfully", extra)
}

/// PUT /api/health-units/:id
pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateHealthUnitRequest>,
) -> Response {
    let unit_id = match parse_unit_id(&id) {
        Ok(unit_id) => unit_id,
        Err(response) => return response,
    };

    if let Err(e) = ensure_administrative(&ctx.principal, reasons::UPDATE_HEALTH_UNITS) {
        return errors::authz_error(&e);
    }

    let unit = match services.health_units.get_health_unit(unit_id).await {
        Ok(Some(unit)) => unit,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => return errors::store_error("updating health unit", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::HealthUnit {
            admin_id: unit.admin_id,
        },
    ) {
        return errors::authz_error(&e);
    }

    let status = match body.status.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    let patch = HealthUnitPatch {
        name: body.name,
        cnpj: body.cnpj,
        status,
    };

    match services.health_units.update_health_unit(unit_id, patch).await {
        Ok(Some(_)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("unit_id".into(), json!(unit_id));
            errors::detail_ok(StatusCode::OK, "Health unit updated successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => errors::store_error("updating health unit", &e),
    }
}

/// DELETE /api/health-units/:id
pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let unit_id = match parse_unit_id(&id) {
        Ok(unit_id) => unit_id,
        Err(response) => return response,
    };

    if let Err(e) = ensure_administrative(&ctx.principal, reasons::DELETE_HEALTH_UNITS) {
        return errors::authz_error(&e);
    }

    let unit = match services.health_units.get_health_unit(unit_id).await {
        Ok(Some(unit)) => unit,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => return errors::store_error("deleting health unit", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::HealthUnit {
            admin_id: unit.admin_id,
        },
    ) {
        return errors::authz_error(&e);
    }

    match services.health_units.delete_health_unit(unit_id).await {
        Ok(true) => {
            let mut extra = serde_json::Map::new();
            extra.insert("unit_id".into(), json!(unit_id));
            errors::detail_ok(StatusCode::OK, "Health unit deleted successfully", extra)
        }
        Ok(false) => errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => errors::store_error("deleting health unit", &e),
    }
}
