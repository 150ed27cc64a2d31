//! Auth routes: email/password login and self-registration.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{password, tokens};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::user::{User, UserResponse, UserRole};
use crate::repositories::users;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; token also in the Authorization header", body = LoginResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 401, description = "Invalid credentials", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<([(axum::http::HeaderName, String); 1], Json<LoginResponse>), ApiError> {
    let mut errors = Vec::new();
    super::require_non_empty(&mut errors, "email", &body.email);
    super::require_non_empty(&mut errors, "password", &body.password);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let email = body.email.trim().to_lowercase();
    let user = users::find_by_email(state.store.as_ref(), &email)
        .await?
        .filter(|u| password::verify_password(&body.password, &u.password_hash))
        .ok_or_else(|| {
            tracing::info!(%email, "failed login attempt");
            ApiError::unauthorized("Invalid credentials")
        })?;

    let ttl = state.config.token_ttl;
    let token = tokens::mint_access_token(&state.keys, &user.id, &user.username, user.role, ttl)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok((
        [(AUTHORIZATION, format!("Bearer {token}"))],
        Json(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: ttl.as_secs(),
            user: user.into(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/register
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Shared by self-registration and admin user edits.
pub(crate) fn validate_identity(username: &str, email: &str, errors: &mut Vec<FieldError>) {
    let username_len = username.chars().count();
    if !(3..=32).contains(&username_len) {
        errors.push(FieldError {
            field: "username".to_string(),
            message: "Username must be 3 to 32 characters".to_string(),
        });
    }
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        errors.push(FieldError {
            field: "email".to_string(),
            message: "A valid email address is required".to_string(),
        });
    }
}

pub(crate) fn validate_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < 8 {
        errors.push(FieldError {
            field: "password".to_string(),
            message: "Password must be at least 8 characters".to_string(),
        });
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 409, description = "Email already registered", body = ApiErrorBody),
    ),
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    let mut errors = Vec::new();
    validate_identity(&username, &email, &mut errors);
    validate_password(&body.password, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let now = Utc::now();
    // Self-registration never grants elevated roles.
    let user = User {
        id: User::generate(),
        username,
        email,
        password_hash: password::hash_password(&body.password)?,
        role: UserRole::Member,
        created_at: now,
        updated_at: now,
    };
    users::create(state.store.as_ref(), &user).await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}
