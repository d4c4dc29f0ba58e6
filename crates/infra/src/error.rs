//! Storage error model.

use thiserror::Error;

/// Infrastructure-level storage failure.
///
/// Domain failures (validation, ownership) never originate here; a repository
/// only reports what the store itself could not do.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate email, duplicate
    /// subscription).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back into its domain type.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Any other database failure (connection, syntax, pool).
    #[error("storage error: {0}")]
    Database(String),
}

/// Map a sqlx error onto [`StoreError`], preserving unique-violation
/// conflicts (Postgres error code 23505).
pub fn map_sqlx_error(operation: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict(format!("{operation}: {}", db.message()));
        }
    }
    StoreError::Database(format!("{operation}: {e}"))
}
