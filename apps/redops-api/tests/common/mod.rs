#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use jsonwebtoken::{Algorithm, Header};
use redops_common::PrefixedId;

use redops_api::auth::password;
use redops_api::auth::tokens::{self, Claims};
use redops_api::config::Config;
use redops_api::db::store::MemoryStore;
use redops_api::gateway::Hub;
use redops_api::models::user::{User, UserRole};
use redops_api::repositories;
use redops_api::AppState;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl: Duration::from_secs(3600),
        port: 0,
        cors_origin: "http://localhost:5173".to_string(),
        ws_buffer_capacity: 256,
        ws_write_timeout: Duration::from_secs(10),
    }
}

/// Build a test AppState on the in-memory store with a running hub.
pub fn test_state() -> AppState {
    AppState::new(test_config(), Arc::new(MemoryStore::new()), Hub::start())
}

pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = redops_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Insert a user straight into the store and return it with a valid token.
pub async fn create_user(state: &AppState, username: &str, role: UserRole) -> (User, String) {
    let now = Utc::now();
    let user = User {
        id: User::generate(),
        username: username.to_string(),
        email: format!("{username}@redops.test"),
        password_hash: password::hash_password(TEST_PASSWORD).expect("hash"),
        role,
        created_at: now,
        updated_at: now,
    };
    repositories::users::create(state.store.as_ref(), &user)
        .await
        .expect("create user");

    let token = tokens::mint_access_token(
        &state.keys,
        &user.id,
        &user.username,
        user.role,
        state.config.token_ttl,
    )
    .expect("mint token");

    (user, token)
}

/// A correctly signed token whose expiry is already in the past.
pub fn expired_token(state: &AppState, user: &User) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role,
        iat: now - 7200,
        exp: now - 3600,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &state.keys.encoding)
        .expect("mint expired token")
}

/// Create an operation through the API and return its id.
pub async fn create_operation(server: &axum_test::TestServer, token: &str, name: &str) -> String {
    use axum::http::header::AUTHORIZATION;
    use axum::http::StatusCode;

    let resp = server
        .post("/api/operations")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "name": name, "type": "red_team" }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Create a task under `operation_id` and return its id.
pub async fn create_task(
    server: &axum_test::TestServer,
    token: &str,
    operation_id: &str,
    title: &str,
) -> String {
    use axum::http::header::AUTHORIZATION;
    use axum::http::StatusCode;

    let resp = server
        .post(&format!("/api/operations/{operation_id}/tasks"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "title": title }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string()
}
