//! Attendance (visit) routes.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use medrec_auth::scope::{ensure_administrative, reasons};
use medrec_auth::{verify_ownership, MutationOp, OwnedResourceRef};
use medrec_core::{AttendanceId, HealthUnitId};
use medrec_infra::{AttendancePatch, NewAttendance};

use crate::app::dto::{CreateAttendanceRequest, UpdateAttendanceRequest};
use crate::app::{errors, AppServices};
use crate::context::AuthContext;

fn parse_attendance_id(raw: &str) -> Result<AttendanceId, Response> {
    raw.parse::<AttendanceId>()
        .map_err(|_| errors::detail_error(StatusCode::BAD_REQUEST, "Invalid attendance ID"))
}

/// POST /api/attendances/create - record a visit.
///
/// The route class restricts this to professionals; the resolved scope is
/// the professional's administrator subtree, and the target health unit must
/// belong to it.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateAttendanceRequest>,
) -> Response {
    let health_unit_id = match body.health_unit_id.parse::<HealthUnitId>() {
        Ok(health_unit_id) => health_unit_id,
        Err(_) => return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid health unit ID"),
    };

    let unit = match services.health_units.get_health_unit(health_unit_id).await {
        Ok(Some(unit)) => unit,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Health unit not found"),
        Err(e) => return errors::store_error("adding attendance", &e),
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

    // The route class only admits professionals, whose scope is always
    // restricted to their administrator.
    let Some(admin_id) = ctx.scope.admin_id() else {
        return errors::detail_error(
            StatusCode::FORBIDDEN,
            "Professional account has no administrator assigned",
        );
    };

    match services
        .attendances
        .add_attendance(NewAttendance {
            admin_id,
            professional_id: ctx.principal.id,
            health_unit_id,
            model_used: body.model_used,
            model_result: body.model_result,
            expected_result: body.expected_result,
            correct_diagnosis: body.correct_diagnosis,
            image_base64: body.image_base64,
            observation: body.observation,
        })
        .await
    {
        Ok(record) => {
            let mut extra = serde_json::Map::new();
            extra.insert("attendance_id".into(), json!(record.id));
            errors::detail_ok(StatusCode::CREATED, "Attendance added successfully", extra)
        }
        Err(e) => errors::store_error("adding attendance", &e),
    }
}

/// GET /api/attendances/list - attendances visible under the caller's scope
/// (professionals see only their own records).
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    match services.attendances.list_attendances(&ctx.scope).await {
        Ok(attendances) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(attendances.len()));
            extra.insert("attendances".into(), json!(attendances));
            errors::detail_ok(
                StatusCode::OK,
                "Attendances retrieved successfully",
                extra,
            )
        }
        Err(e) => errors::store_error("retrieving attendances", &e),
    }
}

/// GET /api/attendances/:id
pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let attendance_id = match parse_attendance_id(&id) {
        Ok(attendance_id) => attendance_id,
        Err(response) => return response,
    };

    match services.attendances.get_attendance(attendance_id).await {
        Ok(Some(attendance)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("attendance".into(), json!(attendance));
            errors::detail_ok(StatusCode::OK, "Attendance retrieved successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "Attendance not found"),
        Err(e) => errors::store_error("retrieving attendance", &e),
    }
}

/// PUT /api/attendances/:id
pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAttendanceRequest>,
) -> Response {
    let attendance_id = match parse_attendance_id(&id) {
        Ok(attendance_id) => attendance_id,
        Err(response) => return response,
    };

    let existing = match services.attendances.get_attendance(attendance_id).await {
        Ok(Some(attendance)) => attendance,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Attendance not found"),
        Err(e) => return errors::store_error("updating attendance", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::Attendance {
            professional_id: existing.professional_id,
            op: MutationOp::Update,
        },
    ) {
        return errors::authz_error(&e);
    }

    let health_unit_id = match body.health_unit_id.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<HealthUnitId>() {
            Ok(health_unit_id) => Some(health_unit_id),
            Err(_) => {
                return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid health unit ID");
            }
        },
    };

    let patch = AttendancePatch {
        health_unit_id,
        model_used: body.model_used,
        model_result: body.model_result,
        expected_result: body.expected_result,
        correct_diagnosis: body.correct_diagnosis,
        observation: body.observation,
    };

    match services.attendances.update_attendance(attendance_id, patch).await {
        Ok(Some(_)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("attendance_id".into(), json!(attendance_id));
            errors::detail_ok(StatusCode::OK, "Attendance updated successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "Attendance not found"),
        Err(e) => errors::store_error("updating attendance", &e),
    }
}

/// DELETE /api/attendances/:id
pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let attendance_id = match parse_attendance_id(&id) {
        Ok(attendance_id) => attendance_id,
        Err(response) => return response,
    };

    let existing = match services.attendances.get_attendance(attendance_id).await {
        Ok(Some(attendance)) => attendance,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Attendance not found"),
        Err(e) => return errors::store_error("deleting attendance", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::Attendance {
            professional_id: existing.professional_id,
            op: MutationOp::Delete,
        },
    ) {
        return errors::authz_error(&e);
    }

    match services.attendances.delete_attendance(attendance_id).await {
        Ok(true) => {
            let mut extra = serde_json::Map::new();
            extra.insert("attendance_id".into(), json!(attendance_id));
            errors::detail_ok(StatusCode::OK, "Attendance deleted successfully", extra)
        }
        Ok(false) => errors::detail_error(StatusCode::NOT_FOUND, "Attendance not found"),
        Err(e) => errors::store_error("deleting attendance", &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    /// `DD-MM-YYYY`.
    pub start_date: Option<String>,
    /// `DD-MM-YYYY`.
    pub end_date: Option<String>,
}

/// GET /api/attendances/statistics/summary - aggregate counts for the
/// caller's subtree (everything for the general administrator).
pub async fn statistics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<StatisticsQuery>,
) -> Response {
    if let Err(e) = ensure_administrative(&ctx.principal, reasons::STATISTICS) {
        return errors::authz_error(&e);
    }

    let parse = |raw: Option<&str>| -> Result<Option<NaiveDate>, Response> {
        match raw {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%d-%m-%Y").map(Some).map_err(|_| {
                errors::detail_error(
                    StatusCode::BAD_REQUEST,
                    "Invalid date format. Dates must be in DD-MM-YYYY format.",
                )
            }),
        }
    };

    let start_date = match parse(query.start_date.as_deref()) {
        Ok(date) => date,
        Err(response) => return response,
    };
    let end_date = match parse(query.end_date.as_deref()) {
        Ok(date) => date,
        Err(response) => return response,
    };

    match services
        .attendances
        .statistics(&ctx.subtree_scope(), start_date, end_date)
        .await
    {
        Ok(statistics) => {
            let mut extra = serde_json::Map::new();
            extra.insert("statistics".into(), json!(statistics));
            errors::detail_ok(StatusCode::OK, "Statistics retrieved successfully", extra)
        }
        Err(e) => errors::store_error("retrieving statistics", &e),
    }
}
