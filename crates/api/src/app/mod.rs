//! HTTP application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: the single error→response boundary
//! - `predictor.rs`: pre-trained model boundary

use std::sync::Arc;

use axum::{Extension, Router};

use medrec_auth::{AuthConfig, TokenCodec};
use medrec_infra::{
    AttendanceRepository, HealthUnitRepository, RootUserConfig, SubscriptionRepository,
    UserRepository,
};

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod predictor;
pub mod routes;

use predictor::Predictor;

/// Everything the handlers need, built once at startup.
pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub health_units: Arc<dyn HealthUnitRepository>,
    pub attendances: Arc<dyn AttendanceRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub predictor: Arc<dyn Predictor>,
    pub codec: Arc<TokenCodec>,
    /// Seed values for the bootstrap administrator, when configured.
    pub root_user: Option<RootUserConfig>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(config: AuthConfig, services: AppServices) -> Router {
    let config = Arc::new(config);
    let auth_state = AuthState::new(config, services.codec.clone());

    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
}
