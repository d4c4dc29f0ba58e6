//! User, login and subscription routes.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;

use medrec_auth::scope::{
    ensure_administrative, ensure_general_administrator, ensure_self_or_administrative, reasons,
};
use medrec_auth::{hash_password, verify_password, MutationOp, OwnedResourceRef, Principal, Role, verify_ownership};
use medrec_core::{SubscriptionId, UserId};
use medrec_infra::{NewSubscription, NewUser, UserPatch, UserStatus};

use crate::app::dto::{
    CreateSubscriptionRequest, CreateUserRequest, LoginRequest, UpdateUserRequest,
};
use crate::app::{errors, AppServices};
use crate::context::AuthContext;

const DATE_FORMAT: &str = "%d-%m-%Y";

fn is_email_valid(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, Response> {
    raw.parse::<UserId>()
        .map_err(|_| errors::detail_error(StatusCode::BAD_REQUEST, "Invalid user ID"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/login - authenticate and issue an identity token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let user = match services.users.get_user_by_email(&body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => return errors::store_error("login", &e),
    };

    if user.status != UserStatus::Active {
        return errors::detail_error(StatusCode::FORBIDDEN, "User account is inactive");
    }

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(email = %body.email, "login attempt with incorrect password");
            return errors::detail_error(StatusCode::UNAUTHORIZED, "Incorrect password");
        }
        Err(e) => {
            tracing::error!(error = %e, "stored password hash could not be verified");
            return errors::detail_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error during login process",
            );
        }
    }

    let principal = Principal::new(user.id, &user.full_name, &user.email, user.role, user.admin_id);
    let token = match services.codec.issue_with_default_ttl(&principal) {
        Ok(token) => token,
        Err(e) => {
            return errors::detail_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    tracing::info!(email = %user.email, "user logged in");
    let mut extra = serde_json::Map::new();
    extra.insert("user_name".into(), json!(user.full_name));
    extra.insert("user_id".into(), json!(user.id));
    extra.insert("profile".into(), json!(user.role));
    extra.insert("token".into(), json!(token));
    errors::detail_ok(StatusCode::OK, "Login successful", extra)
}

// ─────────────────────────────────────────────────────────────────────────────
// User CRUD
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/users - create a user (administrator tiers only).
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    if let Err(e) = ensure_administrative(&ctx.principal, reasons::ADD_USERS) {
        return errors::authz_error(&e);
    }
    add_user_impl(&services, &ctx, body, None).await
}

/// POST /api/users/professionals/create - create a professional attached to
/// the calling administrator. The route class already restricts this to
/// administrator tiers.
pub async fn create_professional(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    add_user_impl(&services, &ctx, body, Some(Role::Professional)).await
}

async fn add_user_impl(
    services: &AppServices,
    ctx: &AuthContext,
    body: CreateUserRequest,
    forced_role: Option<Role>,
) -> Response {
    for (field, value) in [
        ("full_name", &body.full_name),
        ("email", &body.email),
        ("password", &body.password),
        ("profile", &body.profile),
    ] {
        if value.trim().is_empty() {
            return errors::detail_error(
                StatusCode::BAD_REQUEST,
                format!("Error adding user: {field} cannot be empty"),
            );
        }
    }

    let role = match forced_role {
        Some(role) => role,
        None => match body.profile.parse::<Role>() {
            Ok(role) => role,
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid profile. Should be one of: general_administrator, administrator, professional",
                );
            }
        },
    };

    let status = match body.status.as_deref() {
        None => UserStatus::Active,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => status,
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    if !is_email_valid(&body.email) {
        return errors::detail_error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email format");
    }

    match services.users.get_user_by_email(&body.email).await {
        Ok(Some(_)) => {
            return errors::detail_error(
                StatusCode::CONFLICT,
                "User with this email already exists",
            );
        }
        Ok(None) => {}
        Err(e) => return errors::store_error("adding user", &e),
    }

    // A professional created by an administrator is attached to that
    // administrator; the general administrator provisions unlinked
    // professionals (they stay denied until linked).
    let admin_id = match (role, ctx.principal.role) {
        (Role::Professional, Role::Administrator) => Some(ctx.principal.id),
        _ => None,
    };

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::detail_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error adding user to database",
            );
        }
    };

    match services
        .users
        .add_user(NewUser {
            full_name: body.full_name.trim().to_string(),
            email: body.email.trim().to_lowercase(),
            password_hash,
            role,
            admin_id,
            status,
        })
        .await
    {
        Ok(record) => {
            let mut extra = serde_json::Map::new();
            extra.insert("user_id".into(), json!(record.id));
            errors::detail_ok(StatusCode::CREATED, "User added successfully", extra)
        }
        Err(medrec_infra::StoreError::Conflict(_)) => errors::detail_error(
            StatusCode::CONFLICT,
            "User with this email already exists",
        ),
        Err(e) => errors::store_error("adding user", &e),
    }
}

/// GET /api/users - list users visible under the caller's scope.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    match services.users.list_users(&ctx.subtree_scope()).await {
        Ok(users) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(users.len()));
            extra.insert("users".into(), json!(users));
            errors::detail_ok(StatusCode::OK, "Users retrieved successfully", extra)
        }
        Err(e) => errors::store_error("retrieving users", &e),
    }
}

/// GET /api/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match parse_user_id(&id) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    if let Err(e) = ensure_self_or_administrative(&ctx.principal, user_id, reasons::READ_USER) {
        return errors::authz_error(&e);
    }

    match services.users.get_user_by_id(user_id).await {
        Ok(Some(user)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("user".into(), json!(user));
            errors::detail_ok(StatusCode::OK, "User retrieved successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => errors::store_error("retrieving user", &e),
    }
}

/// PUT /api/users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Response {
    let user_id = match parse_user_id(&id) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    if let Err(e) = ensure_self_or_administrative(&ctx.principal, user_id, reasons::UPDATE_USER) {
        return errors::authz_error(&e);
    }

    let existing = match services.users.get_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => return errors::store_error("updating user", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::User {
            id: existing.id,
            role: existing.role,
            admin_id: existing.admin_id,
            op: MutationOp::Update,
        },
    ) {
        return errors::authz_error(&e);
    }

    if let Some(email) = body.email.as_deref() {
        if !is_email_valid(email) {
            return errors::detail_error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email format");
        }
        match services.users.get_user_by_email(email).await {
            Ok(Some(other)) if other.id != user_id => {
                return errors::detail_error(StatusCode::CONFLICT, "Email already in use");
            }
            Ok(_) => {}
            Err(e) => return errors::store_error("updating user", &e),
        }
    }

    let role = match body.profile.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid profile. Should be one of: general_administrator, administrator, professional",
                );
            }
        },
    };

    let status = match body.status.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    let password_hash = match body.password.as_deref() {
        None => None,
        Some(password) => match hash_password(password) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::error!(error = %e, "password hashing failed");
                return errors::detail_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update user",
                );
            }
        },
    };

    let patch = UserPatch {
        full_name: body.full_name,
        email: body.email.map(|e| e.trim().to_lowercase()),
        password_hash,
        role,
        status,
    };

    match services.users.update_user(user_id, patch).await {
        Ok(Some(_)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("user_id".into(), json!(user_id));
            errors::detail_ok(StatusCode::OK, "User updated successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => errors::store_error("updating user", &e),
    }
}

/// DELETE /api/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match parse_user_id(&id) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    if let Err(e) = ensure_administrative(&ctx.principal, reasons::DELETE_USERS) {
        return errors::authz_error(&e);
    }

    let existing = match services.users.get_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => return errors::store_error("deleting user", &e),
    };

    if let Err(e) = verify_ownership(
        &ctx.principal,
        &ctx.scope,
        OwnedResourceRef::User {
            id: existing.id,
            role: existing.role,
            admin_id: existing.admin_id,
            op: MutationOp::Delete,
        },
    ) {
        return errors::authz_error(&e);
    }

    match services.users.delete_user(user_id).await {
        Ok(true) => {
            let mut extra = serde_json::Map::new();
            extra.insert("user_id".into(), json!(user_id));
            errors::detail_ok(StatusCode::OK, "User deleted successfully", extra)
        }
        Ok(false) => errors::detail_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => errors::store_error("deleting user", &e),
    }
}

/// GET /api/users/administrators/list - general administrator only.
pub async fn list_administrators(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    if let Err(e) = ensure_general_administrator(&ctx.principal, reasons::LIST_ADMINISTRATORS) {
        return errors::authz_error(&e);
    }

    match services.users.list_administrators().await {
        Ok(administrators) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(administrators.len()));
            extra.insert("administrators".into(), json!(administrators));
            errors::detail_ok(
                StatusCode::OK,
                "Administrators retrieved successfully",
                extra,
            )
        }
        Err(e) => errors::store_error("retrieving administrators", &e),
    }
}

/// GET /api/users/professionals/list - professionals inside the caller's
/// subtree.
pub async fn list_professionals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    match services
        .users
        .list_professionals(&ctx.subtree_scope())
        .await
    {
        Ok(professionals) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(professionals.len()));
            extra.insert("professionals".into(), json!(professionals));
            errors::detail_ok(
                StatusCode::OK,
                "Professionals retrieved successfully",
                extra,
            )
        }
        Err(e) => errors::store_error("retrieving professionals", &e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions (route class restricts these to the general administrator)
// ─────────────────────────────────────────────────────────────────────────────

fn parse_subscription_dates(
    start_date: &str,
    end_date: &str,
) -> Result<(NaiveDate, NaiveDate), Response> {
    let parse = |raw: &str| NaiveDate::parse_from_str(raw, DATE_FORMAT);
    match (parse(start_date), parse(end_date)) {
        (Ok(start), Ok(end)) => Ok((start, end)),
        _ => Err(errors::detail_error(
            StatusCode::BAD_REQUEST,
            "Invalid date format. Dates must be in DD-MM-YYYY format.",
        )),
    }
}

/// POST /api/users/subscriptions
pub async fn create_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<AuthContext>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Response {
    let admin_id = match parse_user_id(&body.admin_id) {
        Ok(admin_id) => admin_id,
        Err(response) => return response,
    };

    match services.users.get_user_by_id(admin_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Admin not found"),
        Err(e) => return errors::store_error("creating subscription", &e),
    }

    match services.subscriptions.get_subscription_by_admin(admin_id).await {
        Ok(Some(_)) => {
            return errors::detail_error(
                StatusCode::CONFLICT,
                "User already has a subscription",
            );
        }
        Ok(None) => {}
        Err(e) => return errors::store_error("creating subscription", &e),
    }

    let (start_date, end_date) = match parse_subscription_dates(&body.start_date, &body.end_date)
    {
        Ok(dates) => dates,
        Err(response) => return response,
    };

    let status = match body.status.as_deref() {
        None => UserStatus::Active,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => status,
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    match services
        .subscriptions
        .create_subscription(NewSubscription {
            admin_id,
            start_date,
            end_date,
            status,
        })
        .await
    {
        Ok(_) => {
            let mut extra = serde_json::Map::new();
            extra.insert("admin_id".into(), json!(admin_id));
            errors::detail_ok(
                StatusCode::CREATED,
                "Subscription created successfully",
                extra,
            )
        }
        Err(medrec_infra::StoreError::Conflict(_)) => {
            errors::detail_error(StatusCode::CONFLICT, "User already has a subscription")
        }
        Err(e) => errors::store_error("creating subscription", &e),
    }
}

/// GET /api/users/subscriptions
pub async fn list_subscriptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Response {
    match services.subscriptions.list_subscriptions().await {
        Ok(subscriptions) => {
            let mut extra = serde_json::Map::new();
            extra.insert("count".into(), json!(subscriptions.len()));
            extra.insert("subscriptions".into(), json!(subscriptions));
            errors::detail_ok(
                StatusCode::OK,
                "Subscriptions retrieved successfully",
                extra,
            )
        }
        Err(e) => errors::store_error("retrieving subscriptions", &e),
    }
}

/// GET /api/users/subscriptions/:id
pub async fn get_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Response {
    let subscription_id = match id.parse::<SubscriptionId>() {
        Ok(subscription_id) => subscription_id,
        Err(_) => return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid subscription ID"),
    };

    match services.subscriptions.get_subscription(subscription_id).await {
        Ok(Some(subscription)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("subscription".into(), json!(subscription));
            errors::detail_ok(
                StatusCode::OK,
                "Subscription retrieved successfully",
                extra,
            )
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "Subscription not found"),
        Err(e) => errors::store_error("retrieving subscription", &e),
    }
}

/// PUT /api/users/subscriptions/:id
pub async fn update_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Response {
    let subscription_id = match id.parse::<SubscriptionId>() {
        Ok(subscription_id) => subscription_id,
        Err(_) => return errors::detail_error(StatusCode::BAD_REQUEST, "Invalid subscription ID"),
    };

    match services.subscriptions.get_subscription(subscription_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Subscription not found"),
        Err(e) => return errors::store_error("updating subscription", &e),
    }

    let admin_id = match parse_user_id(&body.admin_id) {
        Ok(admin_id) => admin_id,
        Err(response) => return response,
    };

    match services.users.get_user_by_id(admin_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::detail_error(StatusCode::NOT_FOUND, "Admin not found"),
        Err(e) => return errors::store_error("updating subscription", &e),
    }

    let (start_date, end_date) = match parse_subscription_dates(&body.start_date, &body.end_date)
    {
        Ok(dates) => dates,
        Err(response) => return response,
    };

    let status = match body.status.as_deref() {
        None => UserStatus::Active,
        Some(raw) => match raw.parse::<UserStatus>() {
            Ok(status) => status,
            Err(_) => {
                return errors::detail_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid status. Should be 'active' or 'inactive'",
                );
            }
        },
    };

    match services
        .subscriptions
        .update_subscription(
            subscription_id,
            NewSubscription {
                admin_id,
                start_date,
                end_date,
                status,
            },
        )
        .await
    {
        Ok(Some(_)) => {
            let mut extra = serde_json::Map::new();
            extra.insert("admin_id".into(), json!(admin_id));
            errors::detail_ok(StatusCode::OK, "Subscription updated successfully", extra)
        }
        Ok(None) => errors::detail_error(StatusCode::NOT_FOUND, "Subscription not found"),
        Err(e) => errors::store_error("updating subscription", &e),
    }
}
