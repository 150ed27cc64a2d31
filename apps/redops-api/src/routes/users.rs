//! User directory and profile management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::auth::password;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::operation::Operation;
use crate::models::task::Task;
use crate::models::user::{UserResponse, UserRole};
use crate::repositories::{operations, tasks, users};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/operations", get(list_user_operations))
        .route("/users/{id}/tasks", get(list_user_tasks))
}

// ---------------------------------------------------------------------------
// GET /api/users
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_users(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let list = users::list(state.store.as_ref()).await?;
    Ok(Json(list.into_iter().map(UserResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// GET /api/users/:id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = ApiErrorBody),
    ),
)]
pub async fn get_user(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = users::get(state.store.as_ref(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

// ---------------------------------------------------------------------------
// PUT /api/users/:id
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Admin only.
    pub role: Option<UserRole>,
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
        (status = 404, description = "User not found", body = ApiErrorBody),
        (status = 409, description = "Email already registered", body = ApiErrorBody),
    ),
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    caller.require_self_or_admin(&id)?;
    if body.role.is_some() {
        caller.require_admin()?;
    }

    let store = state.store.as_ref();
    let mut user = users::get(store, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let username = body
        .username
        .map(|u| u.trim().to_string())
        .unwrap_or_else(|| user.username.clone());
    let email = body
        .email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_else(|| user.email.clone());

    let mut errors = Vec::new();
    super::auth::validate_identity(&username, &email, &mut errors);
    if let Some(pw) = &body.password {
        super::auth::validate_password(pw, &mut errors);
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    if email != user.email {
        if let Some(other) = users::find_by_email(store, &email).await? {
            if other.id != user.id {
                return Err(ApiError::conflict("Email is already registered"));
            }
        }
    }

    user.username = username;
    user.email = email;
    if let Some(pw) = &body.password {
        user.password_hash = password::hash_password(pw)?;
    }
    if let Some(role) = body.role {
        user.role = role;
    }
    user.updated_at = Utc::now();

    if !users::update(store, &user).await? {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(user.into()))
}

// ---------------------------------------------------------------------------
// DELETE /api/users/:id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required", body = ApiErrorBody),
        (status = 404, description = "User not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    if caller.user_id == id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }
    if !users::delete(state.store.as_ref(), &id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, by = %caller.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /api/users/:id/operations
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/users/{id}/operations",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Operations the user leads or belongs to", body = Vec<Operation>),
        (status = 404, description = "User not found", body = ApiErrorBody),
    ),
)]
pub async fn list_user_operations(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Operation>>, ApiError> {
    let store = state.store.as_ref();
    if users::get(store, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(operations::for_member(store, &id).await?))
}

// ---------------------------------------------------------------------------
// GET /api/users/:id/tasks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/users/{id}/tasks",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Tasks assigned to the user, across operations", body = Vec<Task>),
        (status = 404, description = "User not found", body = ApiErrorBody),
    ),
)]
pub async fn list_user_tasks(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let store = state.store.as_ref();
    if users::get(store, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(tasks::assigned_to(store, &id).await?))
}
