//! Database schema bootstrap.

use sqlx::PgPool;

use crate::error::{map_sqlx_error, StoreError};

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        profile TEXT NOT NULL,
        admin_id UUID,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS users_admin_id_idx ON users (admin_id)",
    "CREATE TABLE IF NOT EXISTS health_units (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL,
        name TEXT NOT NULL,
        cnpj TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS health_units_admin_id_idx ON health_units (admin_id)",
    "CREATE TABLE IF NOT EXISTS attendances (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL,
        professional_id UUID NOT NULL,
        health_unit_id UUID NOT NULL,
        model_used TEXT NOT NULL,
        model_result TEXT NOT NULL,
        expected_result TEXT NOT NULL,
        correct_diagnosis BOOLEAN NOT NULL,
        image_base64 TEXT NOT NULL,
        observation TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS attendances_admin_id_idx ON attendances (admin_id)",
    "CREATE INDEX IF NOT EXISTS attendances_professional_id_idx ON attendances (professional_id)",
    "CREATE TABLE IF NOT EXISTS subscriptions (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL UNIQUE,
        start_date DATE NOT NULL,
        end_date DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

/// Create all tables and indexes if they do not exist.
pub async fn apply(pool: &PgPool) -> Result<(), StoreError> {
    for statement in DDL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
    }
    Ok(())
}
