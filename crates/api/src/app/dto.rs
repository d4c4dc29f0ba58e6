//! Request DTOs.
//!
//! Role/status/date strings are validated in the handlers so rejections can
//! carry the platform's fixed messages and status codes.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub profile: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHealthUnitRequest {
    /// Owning administrator; optional for administrator callers (their own
    /// id is used), required for the general administrator.
    pub admin_id: Option<String>,
    pub name: String,
    pub cnpj: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateHealthUnitRequest {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAttendanceRequest {
    pub health_unit_id: String,
    pub model_used: String,
    pub model_result: String,
    pub expected_result: String,
    pub correct_diagnosis: bool,
    pub image_base64: String,
    #[serde(default)]
    pub observation: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateAttendanceRequest {
    pub health_unit_id: Option<String>,
    pub model_used: Option<String>,
    pub model_result: Option<String>,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub observation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub admin_id: String,
    /// `DD-MM-YYYY`.
    pub start_date: String,
    /// `DD-MM-YYYY`.
    pub end_date: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub image_base64: String,
}
