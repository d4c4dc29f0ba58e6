//! Prediction/detection routes — thin wrappers over the model boundary.
//!
//! Every inference endpoint is restricted to healthcare professionals; the
//! class listing only needs authentication.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use base64::Engine;
use serde_json::json;

use medrec_auth::scope::{ensure_professional, reasons};

use crate::app::dto::PredictRequest;
use crate::app::predictor::{ModelKind, PredictError};
use crate::app::{errors, AppServices};
use crate::context::AuthContext;

async fn run_model(
    services: &AppServices,
    ctx: &AuthContext,
    model: ModelKind,
    body: PredictRequest,
    denial_reason: &'static str,
) -> Response {
    if let Err(e) = ensure_professional(&ctx.principal, denial_reason) {
        return errors::authz_error(&e);
    }

    let image = match base64::engine::general_purpose::STANDARD.decode(&body.image_base64) {
        Ok(image) => image,
        Err(_) => return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid image data"),
    };

    match services.predictor.predict(model, &image).await {
        Ok(prediction) => {
            let mut extra = serde_json::Map::new();
            extra.insert("model".into(), json!(model.as_str()));
            extra.insert("prediction".into(), json!(prediction));
            errors::detail_ok(StatusCode::OK, "Prediction completed successfully", extra)
        }
        Err(PredictError::BadImage) => {
            errors::detail_error(StatusCode::BAD_REQUEST, "Invalid image data")
        }
        Err(PredictError::Unavailable) => {
            errors::detail_error(StatusCode::SERVICE_UNAVAILABLE, "Model is not available")
        }
        Err(PredictError::Inference(detail)) => {
            tracing::error!(model = model.as_str(), error = %detail, "inference failed");
            errors::detail_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {detail}"),
            )
        }
    }
}

/// POST /api/predictions/respiratory
pub async fn respiratory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<PredictRequest>,
) -> Response {
    run_model(&services, &ctx, ModelKind::Respiratory, body, reasons::PREDICTIONS).await
}

/// POST /api/predictions/breast-cancer
pub async fn breast_cancer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<PredictRequest>,
) -> Response {
    run_model(&services, &ctx, ModelKind::BreastCancer, body, reasons::DETECTIONS).await
}

/// POST /api/predictions/tuberculosis
pub async fn tuberculosis(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<PredictRequest>,
) -> Response {
    run_model(&services, &ctx, ModelKind::Tuberculosis, body, reasons::PREDICTIONS).await
}

/// POST /api/predictions/osteoporosis
pub async fn osteoporosis(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<PredictRequest>,
) -> Response {
    run_model(&services, &ctx, ModelKind::Osteoporosis, body, reasons::PREDICTIONS).await
}

/// GET /api/predictions/classes - labels each model can produce.
pub async fn classes(Extension(_ctx): Extension<AuthContext>) -> Response {
    let mut classes = serde_json::Map::new();
    for model in [
        ModelKind::Respiratory,
        ModelKind::Tuberculosis,
        ModelKind::Osteoporosis,
        ModelKind::BreastCancer,
    ] {
        classes.insert(model.as_str().into(), json!(model.classes()));
    }

    let mut extra = serde_json::Map::new();
    extra.insert("classes".into(), serde_json::Value::Object(classes));
    errors::detail_ok(StatusCode::OK, "Model classes retrieved successfully", extra)
}
