use std::sync::Arc;

use anyhow::Context;

use medrec_api::app::predictor::UnavailablePredictor;
use medrec_api::app::{build_app, AppServices};
use medrec_auth::{AuthConfig, TokenCodec};
use medrec_infra::{
    ensure_root_user, PgAttendances, PgHealthUnits, PgSubscriptions, PgUsers, RootUserConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    medrec_observability::init();

    let config = AuthConfig::from_env()?;
    let postgres_url =
        std::env::var("POSTGRES_URL").context("POSTGRES_URL is not set")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&postgres_url)
        .await
        .context("failed to connect to Postgres")?;

    medrec_infra::schema::apply(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("schema bootstrap failed: {e}"))?;

    let users = Arc::new(PgUsers::new(pool.clone()));
    let codec = Arc::new(TokenCodec::new(&config));

    // Seed the bootstrap administrator at startup when configured; the
    // /api/ensure-root endpoint re-runs the same idempotent path.
    let root_user = RootUserConfig::from_env().ok();
    if let Some(root) = &root_user {
        let (record, created) = ensure_root_user(users.as_ref(), root)
            .await
            .map_err(|e| anyhow::anyhow!("root user setup failed: {e}"))?;
        if created {
            tracing::info!(user_id = %record.id, "root administrator created");
        }
    } else {
        tracing::warn!("MEDREC_ROOT_* not set; skipping root administrator seeding");
    }

    let services = AppServices {
        users,
        health_units: Arc::new(PgHealthUnits::new(pool.clone())),
        attendances: Arc::new(PgAttendances::new(pool.clone())),
        subscriptions: Arc::new(PgSubscriptions::new(pool)),
        predictor: Arc::new(UnavailablePredictor),
        codec,
        root_user,
    };

    let app = build_app(config, services);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .context("failed to bind 0.0.0.0:8080")?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
