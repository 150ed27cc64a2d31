//! Per-user notifications; creating one pushes it to connected clients.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::{Audience, EventType};
use crate::models::notification::{Notification, NotificationKind};
use crate::repositories::notifications;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/notifications/{id}", delete(delete_notification))
}

fn visible_to(notification: &Notification, user: &AuthUser) -> bool {
    match &notification.user_id {
        Some(owner) => *owner == user.user_id,
        None => true,
    }
}

// ---------------------------------------------------------------------------
// GET /api/notifications
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's notifications and broadcast ones", body = Vec<Notification>),
    ),
)]
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        notifications::visible_to(state.store.as_ref(), &user.user_id).await?,
    ))
}

// ---------------------------------------------------------------------------
// POST /api/notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    /// Recipient. Omit to notify everyone.
    pub user_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub link: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification stored and pushed", body = Notification),
        (status = 400, description = "Validation error", body = ApiErrorBody),
    ),
)]
pub async fn create_notification(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let store = state.store.as_ref();
    let title = body.title.trim().to_string();

    let mut errors = Vec::new();
    super::require_name(&mut errors, "title", &title, 200);
    if let Some(recipient) = &body.user_id {
        super::require_users(store, &mut errors, "user_id", std::slice::from_ref(recipient))
            .await?;
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let now = Utc::now();
    let notification = Notification {
        id: Notification::generate(),
        user_id: body.user_id,
        kind: body.kind,
        title,
        message: body.message,
        read: false,
        link: body.link.filter(|l| !l.is_empty()),
        read_by: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    notifications::create(store, &notification).await?;

    let audience = match &notification.user_id {
        Some(recipient) => Audience::User(recipient.clone()),
        None => Audience::All,
    };
    state
        .hub
        .dispatch(EventType::NOTIFICATION, &notification, audience);

    Ok((StatusCode::CREATED, Json(notification)))
}

// ---------------------------------------------------------------------------
// POST /api/notifications/:id/read
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read for the caller", body = Notification),
        (status = 404, description = "Notification not found", body = ApiErrorBody),
    ),
)]
pub async fn mark_read(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let store = state.store.as_ref();
    let notification = notifications::get(store, &id)
        .await?
        .filter(|n| visible_to(n, &user))
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(Json(
        notifications::mark_read(store, notification, &user.user_id).await?,
    ))
}

// ---------------------------------------------------------------------------
// POST /api/notifications/read-all
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Everything visible to the caller marked as read", body = MarkAllReadResponse),
    ),
)]
pub async fn mark_all_read(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = notifications::mark_all_read(state.store.as_ref(), &user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

// ---------------------------------------------------------------------------
// DELETE /api/notifications/:id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 403, description = "Broadcast notifications can only be deleted by an admin", body = ApiErrorBody),
        (status = 404, description = "Notification not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_notification(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    let notification = notifications::get(store, &id)
        .await?
        .filter(|n| user.is_admin() || visible_to(n, &user))
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    if notification.user_id.is_none() {
        user.require_admin()?;
    }
    notifications::delete(store, &notification.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
