//! Postgres-backed repositories.
//!
//! Every list query receives the caller's resolved scope as bind parameters
//! (`NULL` meaning "no restriction"), so a restricted caller cannot reach
//! rows outside its administrator's subtree at the SQL level.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use medrec_auth::{Role, TenantScope};
use medrec_core::{AttendanceId, HealthUnitId, SubscriptionId, UserId};

use crate::error::{map_sqlx_error, StoreError};
use crate::models::{
    AttendancePatch, AttendanceRecord, AttendanceStatistics, HealthUnitPatch, HealthUnitRecord,
    ModelCount, NewAttendance, NewHealthUnit, NewSubscription, NewUser, SubscriptionRecord,
    UserPatch, UserRecord, UserStatus,
};
use crate::repository::{
    AttendanceRepository, HealthUnitRepository, SubscriptionRepository, UserRepository,
};

/// Scope → `(admin filter, professional filter)` bind values.
///
/// `None` binds SQL NULL, which the `($n::uuid IS NULL OR …)` guards treat
/// as "unrestricted".
fn scope_binds(scope: &TenantScope) -> (Option<Uuid>, Option<Uuid>) {
    match scope {
        TenantScope::Unrestricted => (None, None),
        TenantScope::RestrictedToAdmin(admin_id) => (Some(*admin_id.as_uuid()), None),
        TenantScope::RestrictedToAdminAndProfessional(admin_id, professional_id) => (
            Some(*admin_id.as_uuid()),
            Some(*professional_id.as_uuid()),
        ),
    }
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    raw.parse::<Role>()
        .map_err(|e| StoreError::CorruptRow(format!("profile: {e}")))
}

fn parse_status(raw: &str) -> Result<UserStatus, StoreError> {
    raw.parse::<UserStatus>()
        .map_err(|e| StoreError::CorruptRow(format!("status: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, profile, admin_id, status, created_at, updated_at";

fn map_user_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::CorruptRow(e.to_string());
    Ok(UserRecord {
        id: UserId::from_uuid(row.try_get("id").map_err(corrupt)?),
        full_name: row.try_get("full_name").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        password_hash: row.try_get("password_hash").map_err(corrupt)?,
        role: parse_role(row.try_get::<String, _>("profile").map_err(corrupt)?.as_str())?,
        admin_id: row
            .try_get::<Option<Uuid>, _>("admin_id")
            .map_err(corrupt)?
            .map(UserId::from_uuid),
        status: parse_status(row.try_get::<String, _>("status").map_err(corrupt)?.as_str())?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl UserRepository for PgUsers {
    async fn add_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, full_name, email, password_hash, profile, admin_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(UserId::new().as_uuid())
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.admin_id.map(|id| *id.as_uuid()))
            .bind(user.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_user", e))?;
        map_user_row(&row)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_id", e))?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_email", e))?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<UserRecord>, StoreError> {
        let (admin, professional) = scope_binds(scope);
        // An administrator's subtree includes the administrator itself.
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ($1::uuid IS NULL OR admin_id = $1 OR id = $1)
               AND ($2::uuid IS NULL OR id = $2)
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(admin)
            .bind(professional)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(map_user_row).collect()
    }

    async fn list_administrators(&self) -> Result<Vec<UserRecord>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE profile = 'administrator' ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_administrators", e))?;
        rows.iter().map(map_user_row).collect()
    }

    async fn list_professionals(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let (admin, professional) = scope_binds(scope);
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE profile = 'professional'
               AND ($1::uuid IS NULL OR admin_id = $1)
               AND ($2::uuid IS NULL OR id = $2)
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(admin)
            .bind(professional)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_professionals", e))?;
        rows.iter().map(map_user_row).collect()
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!(
            "UPDATE users SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                profile = COALESCE($5, profile),
                status = COALESCE($6, status),
                updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.full_name)
            .bind(patch.email)
            .bind(patch.password_hash)
            .bind(patch.role.map(|r| r.as_str()))
            .bind(patch.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health units
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgHealthUnits {
    pool: PgPool,
}

impl PgHealthUnits {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UNIT_COLUMNS: &str = "id, admin_id, name, cnpj, status, created_at, updated_at";

fn map_unit_row(row: &PgRow) -> Result<HealthUnitRecord, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::CorruptRow(e.to_string());
    Ok(HealthUnitRecord {
        id: HealthUnitId::from_uuid(row.try_get("id").map_err(corrupt)?),
        admin_id: UserId::from_uuid(row.try_get("admin_id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        cnpj: row.try_get("cnpj").map_err(corrupt)?,
        status: parse_status(row.try_get::<String, _>("status").map_err(corrupt)?.as_str())?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl HealthUnitRepository for PgHealthUnits {
    async fn add_health_unit(
        &self,
        unit: NewHealthUnit,
    ) -> Result<HealthUnitRecord, StoreError> {
        let sql = format!(
            "INSERT INTO health_units (id, admin_id, name, cnpj, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, now(), now())
             RETURNING {UNIT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(HealthUnitId::new().as_uuid())
            .bind(unit.admin_id.as_uuid())
            .bind(&unit.name)
            .bind(&unit.cnpj)
            .bind(unit.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_health_unit", e))?;
        map_unit_row(&row)
    }

    async fn get_health_unit(
        &self,
        id: HealthUnitId,
    ) -> Result<Option<HealthUnitRecord>, StoreError> {
        let sql = format!("SELECT {UNIT_COLUMNS} FROM health_units WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_health_unit", e))?;
        row.as_ref().map(map_unit_row).transpose()
    }

    async fn list_health_units(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<HealthUnitRecord>, StoreError> {
        let (admin, _) = scope_binds(scope);
        let sql = format!(
            "SELECT {UNIT_COLUMNS} FROM health_units
             WHERE ($1::uuid IS NULL OR admin_id = $1)
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(admin)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_health_units", e))?;
        rows.iter().map(map_unit_row).collect()
    }

    async fn update_health_unit(
        &self,
        id: HealthUnitId,
        patch: HealthUnitPatch,
    ) -> Result<Option<HealthUnitRecord>, StoreError> {
        let sql = format!(
            "UPDATE health_units SET
                name = COALESCE($2, name),
                cnpj = COALESCE($3, cnpj),
                status = COALESCE($4, status),
                updated_at = now()
             WHERE id = $1
             RETURNING {UNIT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.name)
            .bind(patch.cnpj)
            .bind(patch.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_health_unit", e))?;
        row.as_ref().map(map_unit_row).transpose()
    }

    async fn delete_health_unit(&self, id: HealthUnitId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM health_units WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_health_unit", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Attendances
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgAttendances {
    pool: PgPool,
}

impl PgAttendances {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ATTENDANCE_COLUMNS: &str = "id, admin_id, professional_id, health_unit_id, model_used, \
     model_result, expected_result, correct_diagnosis, image_base64, observation, created_at, updated_at";

fn map_attendance_row(row: &PgRow) -> Result<AttendanceRecord, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::CorruptRow(e.to_string());
    Ok(AttendanceRecord {
        id: AttendanceId::from_uuid(row.try_get("id").map_err(corrupt)?),
        admin_id: UserId::from_uuid(row.try_get("admin_id").map_err(corrupt)?),
        professional_id: UserId::from_uuid(row.try_get("professional_id").map_err(corrupt)?),
        health_unit_id: HealthUnitId::from_uuid(row.try_get("health_unit_id").map_err(corrupt)?),
        model_used: row.try_get("model_used").map_err(corrupt)?,
        model_result: row.try_get("model_result").map_err(corrupt)?,
        expected_result: row.try_get("expected_result").map_err(corrupt)?,
        correct_diagnosis: row.try_get("correct_diagnosis").map_err(corrupt)?,
        image_base64: row.try_get("image_base64").map_err(corrupt)?,
        observation: row.try_get("observation").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl AttendanceRepository for PgAttendances {
    async fn add_attendance(
        &self,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let sql = format!(
            "INSERT INTO attendances (id, admin_id, professional_id, health_unit_id, model_used,
                model_result, expected_result, correct_diagnosis, image_base64, observation,
                created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(AttendanceId::new().as_uuid())
            .bind(attendance.admin_id.as_uuid())
            .bind(attendance.professional_id.as_uuid())
            .bind(attendance.health_unit_id.as_uuid())
            .bind(&attendance.model_used)
            .bind(&attendance.model_result)
            .bind(&attendance.expected_result)
            .bind(attendance.correct_diagnosis)
            .bind(&attendance.image_base64)
            .bind(&attendance.observation)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_attendance", e))?;
        map_attendance_row(&row)
    }

    async fn get_attendance(
        &self,
        id: AttendanceId,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_attendance", e))?;
        row.as_ref().map(map_attendance_row).transpose()
    }

    async fn list_attendances(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (admin, professional) = scope_binds(scope);
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances
             WHERE ($1::uuid IS NULL OR admin_id = $1)
               AND ($2::uuid IS NULL OR professional_id = $2)
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(admin)
            .bind(professional)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_attendances", e))?;
        rows.iter().map(map_attendance_row).collect()
    }

    async fn update_attendance(
        &self,
        id: AttendanceId,
        patch: AttendancePatch,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "UPDATE attendances SET
                health_unit_id = COALESCE($2, health_unit_id),
                model_used = COALESCE($3, model_used),
                model_result = COALESCE($4, model_result),
                expected_result = COALESCE($5, expected_result),
                correct_diagnosis = COALESCE($6, correct_diagnosis),
                observation = COALESCE($7, observation),
                updated_at = now()
             WHERE id = $1
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.health_unit_id.map(|u| *u.as_uuid()))
            .bind(patch.model_used)
            .bind(patch.model_result)
            .bind(patch.expected_result)
            .bind(patch.correct_diagnosis)
            .bind(patch.observation)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_attendance", e))?;
        row.as_ref().map(map_attendance_row).transpose()
    }

    async fn delete_attendance(&self, id: AttendanceId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attendances WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_attendance", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn statistics(
        &self,
        scope: &TenantScope,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<AttendanceStatistics, StoreError> {
        let (admin, professional) = scope_binds(scope);

        let totals = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE correct_diagnosis) AS correct
             FROM attendances
             WHERE ($1::uuid IS NULL OR admin_id = $1)
               AND ($2::uuid IS NULL OR professional_id = $2)
               AND ($3::date IS NULL OR created_at::date >= $3)
               AND ($4::date IS NULL OR created_at::date <= $4)",
        )
        .bind(admin)
        .bind(professional)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("statistics", e))?;

        let by_model_rows = sqlx::query(
            "SELECT model_used, COUNT(*) AS count
             FROM attendances
             WHERE ($1::uuid IS NULL OR admin_id = $1)
               AND ($2::uuid IS NULL OR professional_id = $2)
               AND ($3::date IS NULL OR created_at::date >= $3)
               AND ($4::date IS NULL OR created_at::date <= $4)
             GROUP BY model_used
             ORDER BY count DESC, model_used",
        )
        .bind(admin)
        .bind(professional)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("statistics", e))?;

        let corrupt = |e: sqlx::Error| StoreError::CorruptRow(e.to_string());
        let by_model = by_model_rows
            .iter()
            .map(|row| {
                Ok(ModelCount {
                    model_used: row.try_get("model_used").map_err(corrupt)?,
                    count: row.try_get("count").map_err(corrupt)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(AttendanceStatistics {
            total: totals.try_get("total").map_err(corrupt)?,
            correct_diagnoses: totals.try_get("correct").map_err(corrupt)?,
            by_model,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgSubscriptions {
    pool: PgPool,
}

impl PgSubscriptions {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, admin_id, start_date, end_date, status, created_at";

fn map_subscription_row(row: &PgRow) -> Result<SubscriptionRecord, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::CorruptRow(e.to_string());
    Ok(SubscriptionRecord {
        id: SubscriptionId::from_uuid(row.try_get("id").map_err(corrupt)?),
        admin_id: UserId::from_uuid(row.try_get("admin_id").map_err(corrupt)?),
        start_date: row.try_get("start_date").map_err(corrupt)?,
        end_date: row.try_get("end_date").map_err(corrupt)?,
        status: parse_status(row.try_get::<String, _>("status").map_err(corrupt)?.as_str())?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptions {
    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<SubscriptionRecord, StoreError> {
        let sql = format!(
            "INSERT INTO subscriptions (id, admin_id, start_date, end_date, status, created_at)
             VALUES ($1, $2, $3, $4, $5, now())
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(SubscriptionId::new().as_uuid())
            .bind(subscription.admin_id.as_uuid())
            .bind(subscription.start_date)
            .bind(subscription.end_date)
            .bind(subscription.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_subscription", e))?;
        map_subscription_row(&row)
    }

    async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_subscription", e))?;
        row.as_ref().map(map_subscription_row).transpose()
    }

    async fn get_subscription_by_admin(
        &self,
        admin_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let sql =
            format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE admin_id = $1");
        let row = sqlx::query(&sql)
            .bind(admin_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_subscription_by_admin", e))?;
        row.as_ref().map(map_subscription_row).transpose()
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY created_at");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_subscriptions", e))?;
        rows.iter().map(map_subscription_row).collect()
    }

    async fn update_subscription(
        &self,
        id: SubscriptionId,
        subscription: NewSubscription,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let sql = format!(
            "UPDATE subscriptions SET
                admin_id = $2, start_date = $3, end_date = $4, status = $5
             WHERE id = $1
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(subscription.admin_id.as_uuid())
            .bind(subscription.start_date)
            .bind(subscription.end_date)
            .bind(subscription.status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_subscription", e))?;
        row.as_ref().map(map_subscription_row).transpose()
    }
}
