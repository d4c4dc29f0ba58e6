use axum::{
    routing::{get, post},
    Router,
};

pub mod attendances;
pub mod health_units;
pub mod predictions;
pub mod system;
pub mod users;

/// Full routing tree. The authorization middleware is layered on top by
/// `app::build_app`, so route-class enforcement happens before any handler
/// here runs.
pub fn router() -> Router {
    Router::new()
        .route("/api/status", get(system::status))
        .route("/api/ensure-root", post(system::ensure_root))
        .route("/api/auth/login", post(users::login))
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route(
            "/api/users/professionals/create",
            post(users::create_professional),
        )
        .route(
            "/api/users/administrators/list",
            get(users::list_administrators),
        )
        .route(
            "/api/users/professionals/list",
            get(users::list_professionals),
        )
        .route(
            "/api/users/subscriptions",
            get(users::list_subscriptions).post(users::create_subscription),
        )
        .route(
            "/api/users/subscriptions/:id",
            get(users::get_subscription).put(users::update_subscription),
        )
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/health-units/create", post(health_units::create))
        .route("/api/health-units/list", get(health_units::list))
        .route(
            "/api/health-units/:id",
            get(health_units::get)
                .put(health_units::update)
                .delete(health_units::delete),
        )
        .route("/api/attendances/create", post(attendances::create))
        .route("/api/attendances/list", get(attendances::list))
        .route(
            "/api/attendances/statistics/summary",
            get(attendances::statistics),
        )
        .route(
            "/api/attendances/:id",
            get(attendances::get)
                .put(attendances::update)
                .delete(attendances::delete),
        )
        .route(
            "/api/predictions/respiratory",
            post(predictions::respiratory),
        )
        .route(
            "/api/predictions/breast-cancer",
            post(predictions::breast_cancer),
        )
        .route(
            "/api/predictions/tuberculosis",
            post(predictions::tuberculosis),
        )
        .route(
            "/api/predictions/osteoporosis",
            post(predictions::osteoporosis),
        )
        .route("/api/predictions/classes", get(predictions::classes))
}
