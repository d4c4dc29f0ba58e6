//! Repository traits.
//!
//! List-style reads take the caller's resolved [`TenantScope`] and apply it
//! as a filter; single-record reads return whatever is stored, and the
//! callers re-check ownership through `medrec_auth::verify_ownership`.

use async_trait::async_trait;
use chrono::NaiveDate;

use medrec_auth::TenantScope;
use medrec_core::{AttendanceId, HealthUnitId, SubscriptionId, UserId};

use crate::error::StoreError;
use crate::models::{
    AttendancePatch, AttendanceRecord, AttendanceStatistics, HealthUnitPatch, HealthUnitRecord,
    NewAttendance, NewHealthUnit, NewSubscription, NewUser, SubscriptionRecord, UserPatch,
    UserRecord,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn add_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// All users visible under the scope: an administrator sees itself plus
    /// its professionals, a professional sees only itself.
    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<UserRecord>, StoreError>;

    async fn list_administrators(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn list_professionals(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<UserRecord>, StoreError>;

    /// Apply a partial update; returns the updated record, or `None` when the
    /// user does not exist.
    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait HealthUnitRepository: Send + Sync {
    async fn add_health_unit(
        &self,
        unit: NewHealthUnit,
    ) -> Result<HealthUnitRecord, StoreError>;

    async fn get_health_unit(
        &self,
        id: HealthUnitId,
    ) -> Result<Option<HealthUnitRecord>, StoreError>;

    async fn list_health_units(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<HealthUnitRecord>, StoreError>;

    async fn update_health_unit(
        &self,
        id: HealthUnitId,
        patch: HealthUnitPatch,
    ) -> Result<Option<HealthUnitRecord>, StoreError>;

    async fn delete_health_unit(&self, id: HealthUnitId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn add_attendance(
        &self,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError>;

    async fn get_attendance(
        &self,
        id: AttendanceId,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn list_attendances(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn update_attendance(
        &self,
        id: AttendanceId,
        patch: AttendancePatch,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn delete_attendance(&self, id: AttendanceId) -> Result<bool, StoreError>;

    /// Aggregate counts within the scope, optionally bounded by creation
    /// date.
    async fn statistics(
        &self,
        scope: &TenantScope,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<AttendanceStatistics, StoreError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<SubscriptionRecord, StoreError>;

    async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn get_subscription_by_admin(
        &self,
        admin_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, StoreError>;

    async fn update_subscription(
        &self,
        id: SubscriptionId,
        subscription: NewSubscription,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;
}
