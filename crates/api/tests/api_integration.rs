//! API integration tests.
//!
//! These drive the full router, auth middleware included, against a mock
//! database whose query results are queued per test in call order.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use studyhub_api::{AppState, auth_middleware, router as api_router};
use studyhub_common::config::{
    AuthConfig, Config, DatabaseConfig, ServerConfig, StorageConfig,
};
use studyhub_core::{EmailService, NoOpStorage};
use studyhub_db::entities::{
    ReportTarget, category, note,
    report::{self, ReportStatus},
    user::{self, Role},
};
use tower::ServiceExt;

fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "https://study.example.com".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret".to_string(),
            token_ttl_secs: 3600,
            reset_token_ttl_secs: 3600,
        },
        storage: StorageConfig::default(),
        email: None,
    }
}

fn create_test_state(db: DatabaseConnection) -> AppState {
    let config = create_test_config();
    AppState::new(
        Arc::new(db),
        &config,
        EmailService::disabled(),
        Arc::new(NoOpStorage::new(&config.files_base_url())),
    )
}

fn create_test_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn empty_app() -> Router {
    create_test_app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
    ))
}

fn create_test_user(id: &str, role: Role) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: String::new(),
        name: id.to_string(),
        bio: None,
        avatar_url: None,
        role,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_note(id: &str, user_id: &str) -> note::Model {
    note::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        category_id: None,
        title: "Ownership".to_string(),
        content: "Every value has one owner".to_string(),
        tags: serde_json::json!(["rust"]),
        is_approved: true,
        upvotes: 0,
        downvotes: 0,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn bearer_for(state: &AppState, user_id: &str) -> String {
    let token = state.account_service.issue_token(user_id).unwrap();
    format!("Bearer {token}")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let response = empty_app()
        .oneshot(get_request("/api/nonexistent/endpoint", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized_envelope() {
    let response = empty_app()
        .oneshot(get_request("/api/auth/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_garbage_token_is_treated_as_anonymous() {
    let response = empty_app()
        .oneshot(json_request(
            "POST",
            "/api/notes",
            Some("Bearer not-a-token"),
            r#"{"title":"t","content":"c"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_token_returns_account() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", Role::User)]])
        .into_connection();
    let state = create_test_state(db);
    let auth = bearer_for(&state, "alice");

    let response = create_test_app(state)
        .oneshot(get_request("/api/auth/me", Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_with_invalid_json_is_bad_request() {
    let response = empty_app()
        .oneshot(json_request("POST", "/api/auth/register", None, "invalid json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_register_with_short_password_is_validation_error() {
    let response = empty_app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            r#"{"email":"new@example.com","password":"short","name":"New"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_unknown_email() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let response = create_test_app(create_test_state(db))
        .oneshot(json_request(
            "POST",
            "/api/auth/password/forgot",
            None,
            r#"{"email":"nobody@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_hidden_note_is_not_found_for_anonymous() {
    // The visibility predicate filters the row out in SQL
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<note::Model>::new()])
        .into_connection();

    let response = create_test_app(create_test_state(db))
        .oneshot(get_request("/api/notes/n1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_vote_with_malformed_direction_is_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", Role::User)]])
        .into_connection();
    let state = create_test_state(db);
    let auth = bearer_for(&state, "alice");

    let response = create_test_app(state)
        .oneshot(json_request(
            "POST",
            "/api/notes/n1/vote",
            Some(&auth),
            r#"{"direction":"sideways"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_report_is_business_error() {
    let existing = report::Model {
        id: "r1".to_string(),
        reporter_id: "alice".to_string(),
        target_type: ReportTarget::Note,
        target_id: "n1".to_string(),
        reason: "spam".to_string(),
        status: ReportStatus::Pending,
        moderator_id: None,
        moderator_note: None,
        created_at: Utc::now().into(),
        reviewed_at: None,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", Role::User)]])
        .append_query_results([[create_test_note("n1", "bob")]])
        .append_query_results([[existing]])
        .into_connection();
    let state = create_test_state(db);
    let auth = bearer_for(&state, "alice");

    let response = create_test_app(state)
        .oneshot(json_request(
            "POST",
            "/api/reports",
            Some(&auth),
            r#"{"targetType":"note","targetId":"n1","reason":"spam again"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "You have already reported this content");
}

#[tokio::test]
async fn test_report_on_missing_target_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", Role::User)]])
        .append_query_results([Vec::<note::Model>::new()])
        .into_connection();
    let state = create_test_state(db);
    let auth = bearer_for(&state, "alice");

    let response = create_test_app(state)
        .oneshot(json_request(
            "POST",
            "/api/reports",
            Some(&auth),
            r#"{"targetType":"note","targetId":"gone","reason":"spam"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_platform_stats_require_moderator() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", Role::User)]])
        .into_connection();
    let state = create_test_state(db);
    let auth = bearer_for(&state, "alice");

    let response = create_test_app(state)
        .oneshot(get_request("/api/stats/platform", Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_categories_are_public() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[category::Model {
            id: "c1".to_string(),
            name: "Algorithms".to_string(),
            description: None,
            position: 0,
            created_at: Utc::now().into(),
        }]])
        .into_connection();

    let response = create_test_app(create_test_state(db))
        .oneshot(get_request("/api/categories", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "Algorithms");
}

#[tokio::test]
async fn test_joined_groups_require_auth() {
    let response = empty_app()
        .oneshot(get_request("/api/groups?joined=true", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
