//! `medrec-infra` — relational persistence for the platform.
//!
//! Repository traits plus two implementations per store: Postgres (sqlx) for
//! production and in-memory for tests/dev. List queries take the caller's
//! resolved [`medrec_auth::TenantScope`] as a filter predicate; all
//! authorization decisions stay in `medrec-auth`.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod schema;
pub mod seed;

pub use error::StoreError;
pub use memory::{
    InMemoryAttendances, InMemoryHealthUnits, InMemorySubscriptions, InMemoryUsers,
};
pub use models::{
    AttendancePatch, AttendanceRecord, AttendanceStatistics, HealthUnitPatch, HealthUnitRecord,
    ModelCount, NewAttendance, NewHealthUnit, NewSubscription, NewUser, SubscriptionRecord,
    UserPatch, UserRecord, UserStatus,
};
pub use postgres::{PgAttendances, PgHealthUnits, PgSubscriptions, PgUsers};
pub use repository::{
    AttendanceRepository, HealthUnitRepository, SubscriptionRepository, UserRepository,
};
pub use seed::{ensure_root_user, RootUserConfig};
