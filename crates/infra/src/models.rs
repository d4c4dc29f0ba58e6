//! Stored record shapes and mutation inputs.

use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use medrec_auth::Role;
use medrec_core::{AttendanceId, DomainError, HealthUnitId, SubscriptionId, UserId};

/// Account status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            _ => Err(DomainError::validation(
                "Invalid status. Should be 'active' or 'inactive'",
            )),
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// A stored user account. `admin_id` links a professional to the
/// administrator whose subtree it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub admin_id: Option<UserId>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub admin_id: Option<UserId>,
    pub status: UserStatus,
}

/// Partial user update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health units
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthUnitRecord {
    pub id: HealthUnitId,
    pub admin_id: UserId,
    pub name: String,
    pub cnpj: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHealthUnit {
    pub admin_id: UserId,
    pub name: String,
    pub cnpj: String,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Default)]
pub struct HealthUnitPatch {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub status: Option<UserStatus>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Attendances
// ─────────────────────────────────────────────────────────────────────────────

/// A stored attendance (visit) record with its AI-assisted diagnosis fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub admin_id: UserId,
    pub professional_id: UserId,
    pub health_unit_id: HealthUnitId,
    pub model_used: String,
    pub model_result: String,
    pub expected_result: String,
    pub correct_diagnosis: bool,
    #[serde(skip_serializing)]
    pub image_base64: String,
    pub observation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub admin_id: UserId,
    pub professional_id: UserId,
    pub health_unit_id: HealthUnitId,
    pub model_used: String,
    pub model_result: String,
    pub expected_result: String,
    pub correct_diagnosis: bool,
    pub image_base64: String,
    pub observation: String,
}

#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
    pub health_unit_id: Option<HealthUnitId>,
    pub model_used: Option<String>,
    pub model_result: Option<String>,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub observation: Option<String>,
}

/// Aggregated attendance counts for the statistics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceStatistics {
    pub total: i64,
    pub correct_diagnoses: i64,
    pub by_model: Vec<ModelCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCount {
    pub model_used: String,
    pub count: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

/// A stored subscription; at most one per administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub admin_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub admin_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: UserStatus,
}
