use std::sync::Arc;

use chrono::Duration;
use reqwest::StatusCode;
use serde_json::json;

use medrec_api::app::predictor::UnavailablePredictor;
use medrec_api::app::{build_app, AppServices};
use medrec_auth::{hash_password, AuthConfig, Principal, Role, TokenCodec};
use medrec_core::UserId;
use medrec_infra::{
    AttendanceRepository, HealthUnitRepository, InMemoryAttendances, InMemoryHealthUnits,
    InMemorySubscriptions, InMemoryUsers, NewAttendance, NewHealthUnit, NewUser, UserRecord,
    UserRepository, UserStatus,
};

const API_KEY: &str = "test-api-key";
const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    users: Arc<InMemoryUsers>,
    health_units: Arc<InMemoryHealthUnits>,
    attendances: Arc<InMemoryAttendances>,
    codec: Arc<TokenCodec>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = AuthConfig::new(SECRET, API_KEY);
        let codec = Arc::new(TokenCodec::new(&config));
        let users = Arc::new(InMemoryUsers::new());
        let health_units = Arc::new(InMemoryHealthUnits::new());
        let attendances = Arc::new(InMemoryAttendances::new());

        let services = AppServices {
            users: users.clone(),
            health_units: health_units.clone(),
            attendances: attendances.clone(),
            subscriptions: Arc::new(InMemorySubscriptions::new()),
            predictor: Arc::new(UnavailablePredictor),
            codec: codec.clone(),
            root_user: None,
        };

        let app = build_app(config, services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            users,
            health_units,
            attendances,
            codec,
            handle,
        }
    }

    async fn seed_user(&self, role: Role, admin_id: Option<UserId>) -> UserRecord {
        self.users
            .add_user(NewUser {
                full_name: "Seeded User".into(),
                email: format!("{}@example.com", UserId::new()),
                password_hash: hash_password("password123").unwrap(),
                role,
                admin_id,
                status: UserStatus::Active,
            })
            .await
            .unwrap()
    }

    fn token_for(&self, user: &UserRecord) -> String {
        let principal = Principal::new(
            user.id,
            &user.full_name,
            &user.email,
            user.role,
            user.admin_id,
        );
        self.codec
            .issue(&principal, Duration::minutes(10))
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn detail_message(res: reqwest::Response) -> (u16, String) {
    let status = res.status().as_u16();
    let body: serde_json::Value = res.json().await.unwrap();
    let message = body["detail"]["message"].as_str().unwrap_or_default().to_string();
    // The status code is duplicated inside the body and must match.
    assert_eq!(body["detail"]["status_code"].as_u64().unwrap(), status as u64);
    (status, message)
}

// ─────────────────────────────────────────────────────────────────────────────
// API key gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_api_key_is_rejected_with_400() {
    let srv = TestServer::spawn().await;

    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 400);
    assert_eq!(message, "API Key is required");
}

#[tokio::test]
async fn bad_api_key_hides_token_validity() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let token = srv.token_for(&admin);

    // Even with a perfectly valid token, a wrong API key yields the API key
    // rejection, not a token response.
    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .header("api_key", "wrong")
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "Invalid API Key");
}

#[tokio::test]
async fn public_route_needs_only_the_api_key() {
    let srv = TestServer::spawn().await;

    let res = client()
        .get(format!("{}/api/status", srv.base_url))
        .header("api_key", API_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

// ─────────────────────────────────────────────────────────────────────────────
// Token gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_route_requires_a_token() {
    let srv = TestServer::spawn().await;

    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .header("api_key", API_KEY)
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 401);
    assert_eq!(message, "Authorization token is required");
}

#[tokio::test]
async fn expired_token_is_rejected_with_fixed_message() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;

    let principal = Principal::new(
        admin.id,
        &admin.full_name,
        &admin.email,
        admin.role,
        None,
    );
    let token = srv.codec.issue(&principal, Duration::zero()).unwrap();

    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 401);
    assert_eq!(message, "Token has expired");
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let mut token = srv.token_for(&admin);

    let last = token.pop().unwrap();
    token.push(if last == 'A' { 'B' } else { 'A' });

    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 401);
    assert!(message.starts_with("Invalid token:"), "{message}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Role/route decision table over HTTP
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn professional_is_denied_on_admin_routes() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let professional = srv.seed_user(Role::Professional, Some(admin.id)).await;
    let token = srv.token_for(&professional);

    let res = client()
        .post(format!("{}/api/health-units/create", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .json(&json!({ "name": "Clinic", "cnpj": "123" }))
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(
        message,
        "Unauthorized. This request can only be made by administrators."
    );
}

#[tokio::test]
async fn administrator_is_denied_on_professional_routes() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let token = srv.token_for(&admin);

    let res = client()
        .post(format!("{}/api/attendances/create", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .json(&json!({
            "health_unit_id": UserId::new(),
            "model_used": "respiratory",
            "model_result": "Normal",
            "expected_result": "Normal",
            "correct_diagnosis": true,
            "image_base64": "",
        }))
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(
        message,
        "Unauthorized. This request can only be made by healthcare professionals."
    );
}

#[tokio::test]
async fn subscription_routes_are_general_administrator_only() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let general = srv.seed_user(Role::GeneralAdministrator, None).await;

    // An administrator is denied by the subscription override even though
    // the path sits under /api/users.
    let res = client()
        .get(format!("{}/api/users/subscriptions", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&admin))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "Only general administrators can access subscriptions");

    let res = client()
        .get(format!("{}/api/users/subscriptions", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&general))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unlinked_professional_is_denied_not_widened() {
    let srv = TestServer::spawn().await;
    let professional = srv.seed_user(Role::Professional, None).await;
    let token = srv.token_for(&professional);

    let res = client()
        .get(format!("{}/api/attendances/list", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "Professional account has no administrator assigned");
}

#[tokio::test]
async fn predictions_require_a_professional() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let professional = srv.seed_user(Role::Professional, Some(admin.id)).await;

    let res = client()
        .post(format!("{}/api/predictions/respiratory", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&admin))
        .json(&json!({ "image_base64": "" }))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "Only healthcare professionals can access predictions");

    // A professional passes the role gate and reaches the (unwired) model.
    let res = client()
        .post(format!("{}/api/predictions/respiratory", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&professional))
        .json(&json!({ "image_base64": "" }))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 503);
    assert_eq!(message, "Model is not available");
}

// ─────────────────────────────────────────────────────────────────────────────
// Login → token → scoped access
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_issues_a_usable_token() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;

    let res = client()
        .post(format!("{}/api/auth/login", srv.base_url))
        .header("api_key", API_KEY)
        .json(&json!({ "email": admin.email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["detail"]["message"], "Login successful");
    assert_eq!(body["detail"]["profile"], "administrator");
    let token = body["detail"]["token"].as_str().unwrap().to_string();

    let res = client()
        .get(format!("{}/api/users", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_wrong_password_and_inactive_accounts() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;

    let res = client()
        .post(format!("{}/api/auth/login", srv.base_url))
        .header("api_key", API_KEY)
        .json(&json!({ "email": admin.email, "password": "nope" }))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 401);
    assert_eq!(message, "Incorrect password");

    let inactive = srv
        .users
        .add_user(NewUser {
            full_name: "Inactive".into(),
            email: "inactive@example.com".into(),
            password_hash: hash_password("password123").unwrap(),
            role: Role::Professional,
            admin_id: Some(admin.id),
            status: UserStatus::Inactive,
        })
        .await
        .unwrap();

    let res = client()
        .post(format!("{}/api/auth/login", srv.base_url))
        .header("api_key", API_KEY)
        .json(&json!({ "email": inactive.email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "User account is inactive");
}

// ─────────────────────────────────────────────────────────────────────────────
// Ownership over HTTP
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_unit_of_another_administrator_is_unreachable() {
    let srv = TestServer::spawn().await;
    let admin_a = srv.seed_user(Role::Administrator, None).await;
    let admin_b = srv.seed_user(Role::Administrator, None).await;

    let foreign_unit = srv
        .health_units
        .add_health_unit(NewHealthUnit {
            admin_id: admin_b.id,
            name: "Other Clinic".into(),
            cnpj: "456".into(),
            status: UserStatus::Active,
        })
        .await
        .unwrap();

    let res = client()
        .get(format!(
            "{}/api/health-units/{}",
            srv.base_url, foreign_unit.id
        ))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&admin_a))
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "Health unit belongs to a different administrator");
}

#[tokio::test]
async fn attendance_mutation_is_role_asymmetric() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let owner = srv.seed_user(Role::Professional, Some(admin.id)).await;
    let other = srv.seed_user(Role::Professional, Some(admin.id)).await;

    let attendance = srv
        .attendances
        .add_attendance(NewAttendance {
            admin_id: admin.id,
            professional_id: owner.id,
            health_unit_id: medrec_core::HealthUnitId::new(),
            model_used: "respiratory".into(),
            model_result: "Normal".into(),
            expected_result: "Normal".into(),
            correct_diagnosis: true,
            image_base64: String::new(),
            observation: String::new(),
        })
        .await
        .unwrap();

    // An administrator may update an attendance it did not create.
    let res = client()
        .put(format!("{}/api/attendances/{}", srv.base_url, attendance.id))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&admin))
        .json(&json!({ "observation": "reviewed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A different professional may not.
    let res = client()
        .put(format!("{}/api/attendances/{}", srv.base_url, attendance.id))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&other))
        .json(&json!({ "observation": "sneaky" }))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "You do not have permission to update this attendance");

    let res = client()
        .delete(format!("{}/api/attendances/{}", srv.base_url, attendance.id))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&other))
        .send()
        .await
        .unwrap();
    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "You do not have permission to delete this attendance");
}

#[tokio::test]
async fn self_delete_is_always_rejected() {
    let srv = TestServer::spawn().await;
    let general = srv.seed_user(Role::GeneralAdministrator, None).await;

    let res = client()
        .delete(format!("{}/api/users/{}", srv.base_url, general.id))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&general))
        .send()
        .await
        .unwrap();

    let (status, message) = detail_message(res).await;
    assert_eq!(status, 403);
    assert_eq!(message, "User cannot delete itself");
}

#[tokio::test]
async fn professional_listing_is_narrowed_to_own_records() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user(Role::Administrator, None).await;
    let professional = srv.seed_user(Role::Professional, Some(admin.id)).await;
    let colleague = srv.seed_user(Role::Professional, Some(admin.id)).await;

    for owner in [&professional, &colleague] {
        srv.attendances
            .add_attendance(NewAttendance {
                admin_id: admin.id,
                professional_id: owner.id,
                health_unit_id: medrec_core::HealthUnitId::new(),
                model_used: "tuberculosis".into(),
                model_result: "negative".into(),
                expected_result: "negative".into(),
                correct_diagnosis: true,
                image_base64: String::new(),
                observation: String::new(),
            })
            .await
            .unwrap();
    }

    // The professional sees only its own attendance.
    let res = client()
        .get(format!("{}/api/attendances/list", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&professional))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["detail"]["count"], 1);

    // The administrator sees the whole subtree.
    let res = client()
        .get(format!("{}/api/attendances/list", srv.base_url))
        .header("api_key", API_KEY)
        .bearer_auth(srv.token_for(&admin))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["detail"]["count"], 2);
}
