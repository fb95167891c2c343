//! End-to-end account flow over the axum router and in-memory stores.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use rustpress_users::{
    create_routes,
    store::{MemoryRevocationStore, MemoryUserStore, UserStore},
    AuthConfig, SessionService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-secret-key-long-enough!!".to_string(),
        access_token_expiration: 3600,
        refresh_token_expiration: 604800,
        jwt_issuer: "rustpress".to_string(),
        jwt_audience: "rustpress-api".to_string(),
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        cookie_secure: false,
        withdraw_self_only: false,
    }
}

struct TestApp {
    router: Router,
    users: Arc<MemoryUserStore>,
}

impl TestApp {
    fn new() -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let service = SessionService::new(
            config(),
            users.clone(),
            Arc::new(MemoryRevocationStore::new()),
        )
        .unwrap();

        Self {
            router: create_routes(Arc::new(service)),
            users,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookies, body)
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Vec<String>, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn sign_up(&self, email: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .post_json(
                "/users/sign-up/",
                json!({
                    "email": email,
                    "name": "A",
                    "password": "Pw123!",
                    "password_check": "Pw123!",
                    "gender": "M",
                    "birth_date": "1990-01-01"
                }),
            )
            .await;
        (status, body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> (StatusCode, Vec<String>, Value) {
        self.post_json(
            "/users/sign-in/",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self, access: &str, refresh: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(
                Request::post("/users/sign-out/")
                    .header(header::COOKIE, format!("access={access}; refresh={refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        (status, body)
    }
}

fn tokens(body: &Value) -> (String, String) {
    (
        body["token"]["access"].as_str().unwrap().to_string(),
        body["token"]["refresh"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = TestApp::new();

    let (status, user) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["gender"], "M");
    assert_eq!(user["birth_date"], "1990-01-01");
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());

    let (status, cookies, body) = app.sign_in("a@x.com", "Pw123!").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "a@x.com");
    assert!(cookies.iter().any(|c| c.starts_with("access=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh=") && c.contains("HttpOnly")));
    let (access, refresh) = tokens(&body);

    let (status, body) = app.sign_out(&access, &refresh).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Successfully signed out" }));

    let (status, _, body) = app
        .post_json("/users/token/refresh/", json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");

    // Access tokens outlive sign-out until they expire.
    let (status, _, body) = app
        .send(
            Request::get("/users/me/")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert!(body["last_login"].is_string());
}

#[tokio::test]
async fn sign_up_rejects_duplicates_and_mismatches() {
    let app = TestApp::new();
    assert_eq!(app.sign_up("a@x.com").await.0, StatusCode::CREATED);

    let (status, body) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());

    let (status, _, body) = app
        .post_json(
            "/users/sign-up/",
            json!({
                "email": "b@x.com",
                "name": "B",
                "password": "Pw123!",
                "password_check": "Pw999!",
                "gender": "F",
                "birth_date": "1991-02-03"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["password"].is_array());
    assert_eq!(app.users.len().await, 1);
}

#[tokio::test]
async fn sign_up_reports_malformed_fields() {
    let app = TestApp::new();

    let (status, _, body) = app
        .post_json(
            "/users/sign-up/",
            json!({
                "email": "not-an-email",
                "name": "A",
                "password": "Pw123!",
                "password_check": "Pw123!",
                "gender": "M",
                "birth_date": "1990-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());

    let (status, _, body) = app
        .post_json(
            "/users/sign-up/",
            json!({
                "email": "a@x.com",
                "name": "A",
                "password": "Pw123!",
                "password_check": "Pw123!",
                "gender": "M"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "birth_date": ["This field is required."] }));

    let (status, _, body) = app
        .post_json(
            "/users/sign-up/",
            json!({
                "email": "a@x.com",
                "name": "A",
                "password": "Pw123!",
                "password_check": "Pw123!",
                "gender": "Q",
                "birth_date": "1990-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["gender"].is_array());
    assert!(body.get("non_field_errors").is_none());

    let (status, _, body) = app
        .send(
            Request::post("/users/sign-up/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
    assert!(app.users.is_empty().await);
}

#[tokio::test]
async fn sign_in_failures_look_identical() {
    let app = TestApp::new();
    app.sign_up("a@x.com").await;

    let (status_a, cookies_a, body_a) = app.sign_in("a@x.com", "wrong").await;
    let (status_b, cookies_b, body_b) = app.sign_in("nobody@x.com", "Pw123!").await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_a, status_b);
    assert_eq!(body_a, body_b);
    assert_eq!(
        body_a,
        json!({ "detail": "No active account found with the given credentials" })
    );
    assert!(cookies_a.is_empty() && cookies_b.is_empty());
}

#[tokio::test]
async fn sign_out_validation_errors() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Request::post("/users/sign-out/")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["access"].is_array());
    assert!(body["refresh"].is_array());

    let (status, body) = app.sign_out("whatever", "corrupt.refresh.token").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "InvalidError": "Token is invalid or expired." }));
}

#[tokio::test]
async fn second_sign_out_is_rejected() {
    let app = TestApp::new();
    app.sign_up("a@x.com").await;
    let (_, _, body) = app.sign_in("a@x.com", "Pw123!").await;
    let (access, refresh) = tokens(&body);

    assert_eq!(app.sign_out(&access, &refresh).await.0, StatusCode::OK);
    assert_eq!(
        app.sign_out(&access, &refresh).await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn withdrawal_rules() {
    let app = TestApp::new();
    let (_, user) = app.sign_up("a@x.com").await;
    let id = user["id"].as_i64().unwrap();
    let (_, _, body) = app.sign_in("a@x.com", "Pw123!").await;
    let (access, _) = tokens(&body);

    let (status, _, _) = app
        .send(
            Request::delete(format!("/users/{id}/withdraw/"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .send(
            Request::delete(format!("/users/{id}/withdraw/"))
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .send(
            Request::delete("/users/9999/withdraw/")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Cookie credentials work as well as the header.
    let (status, _, _) = app
        .send(
            Request::delete(format!("/users/{id}/withdraw/"))
                .header(header::COOKIE, format!("access={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.users.find_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_token_cannot_authenticate_requests() {
    let app = TestApp::new();
    app.sign_up("a@x.com").await;
    let (_, _, body) = app.sign_in("a@x.com", "Pw123!").await;
    let (_, refresh) = tokens(&body);

    let (status, _, _) = app
        .send(
            Request::get("/users/me/")
                .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app
        .post_json("/users/token/refresh/", json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());
}
