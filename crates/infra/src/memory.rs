//! In-memory repositories for tests and local development.
//!
//! These mirror the Postgres implementations' filtering semantics exactly so
//! API tests exercise the same scope behavior without a database.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use medrec_auth::{Role, TenantScope};
use medrec_core::{AttendanceId, HealthUnitId, SubscriptionId, UserId};

use crate::error::StoreError;
use crate::models::{
    AttendancePatch, AttendanceRecord, AttendanceStatistics, HealthUnitPatch, HealthUnitRecord,
    ModelCount, NewAttendance, NewHealthUnit, NewSubscription, NewUser, SubscriptionRecord,
    UserPatch, UserRecord,
};
use crate::repository::{
    AttendanceRepository, HealthUnitRepository, SubscriptionRepository, UserRepository,
};

fn scope_filter(scope: &TenantScope) -> (Option<UserId>, Option<UserId>) {
    match scope {
        TenantScope::Unrestricted => (None, None),
        TenantScope::RestrictedToAdmin(admin_id) => (Some(*admin_id), None),
        TenantScope::RestrictedToAdminAndProfessional(admin_id, professional_id) => {
            (Some(*admin_id), Some(*professional_id))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryUsers {
    rows: RwLock<Vec<UserRecord>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn add_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut rows = self.rows.write().unwrap();
        if rows.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("add_user: duplicate email".into()));
        }
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            admin_id: user.admin_id,
            status: user.status,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.rows.read().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<UserRecord>, StoreError> {
        let (admin, professional) = scope_filter(scope);
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|u| admin.is_none_or(|a| u.admin_id == Some(a) || u.id == a))
            .filter(|u| professional.is_none_or(|p| u.id == p))
            .cloned()
            .collect())
    }

    async fn list_administrators(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|u| u.role == Role::Administrator)
            .cloned()
            .collect())
    }

    async fn list_professionals(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let (admin, professional) = scope_filter(scope);
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|u| u.role == Role::Professional)
            .filter(|u| admin.is_none_or(|a| u.admin_id == Some(a)))
            .filter(|u| professional.is_none_or(|p| u.id == p))
            .cloned()
            .collect())
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(status) = patch.status {
            user.status = status;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health units
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryHealthUnits {
    rows: RwLock<Vec<HealthUnitRecord>>,
}

impl InMemoryHealthUnits {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealthUnitRepository for InMemoryHealthUnits {
    async fn add_health_unit(
        &self,
        unit: NewHealthUnit,
    ) -> Result<HealthUnitRecord, StoreError> {
        let now = Utc::now();
        let record = HealthUnitRecord {
            id: HealthUnitId::new(),
            admin_id: unit.admin_id,
            name: unit.name,
            cnpj: unit.cnpj,
            status: unit.status,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().unwrap().push(record.clone());
        Ok(record)
    }

    async fn get_health_unit(
        &self,
        id: HealthUnitId,
    ) -> Result<Option<HealthUnitRecord>, StoreError> {
        Ok(self.rows.read().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn list_health_units(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<HealthUnitRecord>, StoreError> {
        let (admin, _) = scope_filter(scope);
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|u| admin.is_none_or(|a| u.admin_id == a))
            .cloned()
            .collect())
    }

    async fn update_health_unit(
        &self,
        id: HealthUnitId,
        patch: HealthUnitPatch,
    ) -> Result<Option<HealthUnitRecord>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let Some(unit) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            unit.name = name;
        }
        if let Some(cnpj) = patch.cnpj {
            unit.cnpj = cnpj;
        }
        if let Some(status) = patch.status {
            unit.status = status;
        }
        unit.updated_at = Utc::now();
        Ok(Some(unit.clone()))
    }

    async fn delete_health_unit(&self, id: HealthUnitId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Attendances
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryAttendances {
    rows: RwLock<Vec<AttendanceRecord>>,
}

impl InMemoryAttendances {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryAttendances {
    async fn add_attendance(
        &self,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let now = Utc::now();
        let record = AttendanceRecord {
            id: AttendanceId::new(),
            admin_id: attendance.admin_id,
            professional_id: attendance.professional_id,
            health_unit_id: attendance.health_unit_id,
            model_used: attendance.model_used,
            model_result: attendance.model_result,
            expected_result: attendance.expected_result,
            correct_diagnosis: attendance.correct_diagnosis,
            image_base64: attendance.image_base64,
            observation: attendance.observation,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().unwrap().push(record.clone());
        Ok(record)
    }

    async fn get_attendance(
        &self,
        id: AttendanceId,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.rows.read().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn list_attendances(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (admin, professional) = scope_filter(scope);
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|a| admin.is_none_or(|x| a.admin_id == x))
            .filter(|a| professional.is_none_or(|p| a.professional_id == p))
            .cloned()
            .collect())
    }

    async fn update_attendance(
        &self,
        id: AttendanceId,
        patch: AttendancePatch,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let Some(attendance) = rows.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(health_unit_id) = patch.health_unit_id {
            attendance.health_unit_id = health_unit_id;
        }
        if let Some(model_used) = patch.model_used {
            attendance.model_used = model_used;
        }
        if let Some(model_result) = patch.model_result {
            attendance.model_result = model_result;
        }
        if let Some(expected_result) = patch.expected_result {
            attendance.expected_result = expected_result;
        }
        if let Some(correct_diagnosis) = patch.correct_diagnosis {
            attendance.correct_diagnosis = correct_diagnosis;
        }
        if let Some(observation) = patch.observation {
            attendance.observation = observation;
        }
        attendance.updated_at = Utc::now();
        Ok(Some(attendance.clone()))
    }

    async fn delete_attendance(&self, id: AttendanceId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() < before)
    }

    async fn statistics(
        &self,
        scope: &TenantScope,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<AttendanceStatistics, StoreError> {
        let (admin, professional) = scope_filter(scope);
        let rows = self.rows.read().unwrap();
        let selected: Vec<&AttendanceRecord> = rows
            .iter()
            .filter(|a| admin.is_none_or(|x| a.admin_id == x))
            .filter(|a| professional.is_none_or(|p| a.professional_id == p))
            .filter(|a| start_date.is_none_or(|d| a.created_at.date_naive() >= d))
            .filter(|a| end_date.is_none_or(|d| a.created_at.date_naive() <= d))
            .collect();

        let mut by_model: Vec<ModelCount> = Vec::new();
        for attendance in &selected {
            match by_model
                .iter_mut()
                .find(|m| m.model_used == attendance.model_used)
            {
                Some(entry) => entry.count += 1,
                None => by_model.push(ModelCount {
                    model_used: attendance.model_used.clone(),
                    count: 1,
                }),
            }
        }
        by_model.sort_by(|a, b| b.count.cmp(&a.count).then(a.model_used.cmp(&b.model_used)));

        Ok(AttendanceStatistics {
            total: selected.len() as i64,
            correct_diagnoses: selected.iter().filter(|a| a.correct_diagnosis).count() as i64,
            by_model,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemorySubscriptions {
    rows: RwLock<Vec<SubscriptionRecord>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<SubscriptionRecord, StoreError> {
        let mut rows = self.rows.write().unwrap();
        if rows.iter().any(|s| s.admin_id == subscription.admin_id) {
            return Err(StoreError::Conflict(
                "create_subscription: admin already subscribed".into(),
            ));
        }
        let record = SubscriptionRecord {
            id: SubscriptionId::new(),
            admin_id: subscription.admin_id,
            start_date: subscription.start_date,
            end_date: subscription.end_date,
            status: subscription.status,
            created_at: Utc::now(),
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.rows.read().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn get_subscription_by_admin(
        &self,
        admin_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .find(|s| s.admin_id == admin_id)
            .cloned())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        Ok(self.rows.read().unwrap().clone())
    }

    async fn update_subscription(
        &self,
        id: SubscriptionId,
        subscription: NewSubscription,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let Some(existing) = rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        existing.admin_id = subscription.admin_id;
        existing.start_date = subscription.start_date;
        existing.end_date = subscription.end_date;
        existing.status = subscription.status;
        Ok(Some(existing.clone()))
    }
}
