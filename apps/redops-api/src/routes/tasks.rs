//! Tasks nested under an operation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::store::DocumentStore;
use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::{Audience, EventType};
use crate::models::operation::{Operation, OperationPhase};
use crate::models::task::{Task, TaskStatus};
use crate::repositories::{operations, results, tasks};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/operations/{id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/operations/{id}/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/operations/{id}/tasks/{task_id}/status",
            patch(update_task_status),
        )
}

/// A malformed id cannot name a stored operation, so it is rejected
/// without a lookup.
async fn load_operation(store: &dyn DocumentStore, id: &str) -> Result<Operation, ApiError> {
    if !Operation::is_valid_id(id) {
        return Err(ApiError::not_found("Operation not found"));
    }
    operations::get(store, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))
}

async fn load_task(
    store: &dyn DocumentStore,
    operation_id: &str,
    task_id: &str,
) -> Result<Task, ApiError> {
    tasks::get_in_operation(store, operation_id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

// ---------------------------------------------------------------------------
// GET /api/operations/:id/tasks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/operations/{id}/tasks",
    tag = "Tasks",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    responses(
        (status = 200, description = "Tasks of the operation", body = Vec<Task>),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn list_tasks(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let store = state.store.as_ref();
    let op = load_operation(store, &id).await?;
    Ok(Json(tasks::by_operation(store, &op.id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/operations/:id/tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: Option<String>,
    pub status: Option<TaskStatus>,
    /// Defaults to the operation's current phase.
    pub phase: Option<OperationPhase>,
    #[serde(default)]
    pub mitre_id: String,
    #[serde(default)]
    pub owasp_id: String,
    #[serde(default)]
    pub results: String,
    #[serde(default)]
    pub tools: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/operations/{id}/tasks",
    tag = "Tasks",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn create_task(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let store = state.store.as_ref();
    let op = load_operation(store, &id).await?;

    let title = body.title.trim().to_string();
    let mut errors = Vec::new();
    super::require_name(&mut errors, "title", &title, 200);
    if let Some(assignee) = &body.assigned_to {
        super::require_users(store, &mut errors, "assigned_to", std::slice::from_ref(assignee))
            .await?;
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let now = Utc::now();
    let task = Task {
        id: Task::generate(),
        operation_id: op.id,
        title,
        description: body.description,
        assigned_to: body.assigned_to,
        status: body.status.unwrap_or_default(),
        phase: body.phase.unwrap_or(op.current_phase),
        mitre_id: body.mitre_id,
        owasp_id: body.owasp_id,
        results: body.results,
        tools: super::unique(body.tools),
        start_date: body.start_date,
        end_date: body.end_date,
        created_at: now,
        updated_at: now,
    };
    tasks::create(store, &task).await?;

    state
        .hub
        .dispatch(EventType::TASK_CREATED, &task, Audience::All);

    Ok((StatusCode::CREATED, Json(task)))
}

// ---------------------------------------------------------------------------
// GET /api/operations/:id/tasks/:task_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/operations/{id}/tasks/{task_id}",
    tag = "Tasks",
    security(("bearer" = [])),
    params(
        ("id" = String, Path, description = "Operation ID"),
        ("task_id" = String, Path, description = "Task ID"),
    ),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn get_task(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(load_task(state.store.as_ref(), &id, &task_id).await?))
}

// ---------------------------------------------------------------------------
// PUT /api/operations/:id/tasks/:task_id
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<TaskStatus>,
    pub phase: Option<OperationPhase>,
    pub mitre_id: Option<String>,
    pub owasp_id: Option<String>,
    pub results: Option<String>,
    pub tools: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    put,
    path = "/api/operations/{id}/tasks/{task_id}",
    tag = "Tasks",
    security(("bearer" = [])),
    params(
        ("id" = String, Path, description = "Operation ID"),
        ("task_id" = String, Path, description = "Task ID"),
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn update_task(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let store = state.store.as_ref();
    let mut task = load_task(store, &id, &task_id).await?;

    let mut errors = Vec::new();
    if let Some(title) = body.title {
        task.title = title.trim().to_string();
        super::require_name(&mut errors, "title", &task.title, 200);
    }
    if let Some(assignee) = body.assigned_to {
        super::require_users(store, &mut errors, "assigned_to", std::slice::from_ref(&assignee))
            .await?;
        task.assigned_to = Some(assignee);
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    if let Some(description) = body.description {
        task.description = description;
    }
    if let Some(status) = body.status {
        task.status = status;
    }
    if let Some(phase) = body.phase {
        task.phase = phase;
    }
    if let Some(mitre_id) = body.mitre_id {
        task.mitre_id = mitre_id;
    }
    if let Some(owasp_id) = body.owasp_id {
        task.owasp_id = owasp_id;
    }
    if let Some(results) = body.results {
        task.results = results;
    }
    if let Some(tools) = body.tools {
        task.tools = super::unique(tools);
    }
    if let Some(start) = body.start_date {
        task.start_date = Some(start);
    }
    if let Some(end) = body.end_date {
        task.end_date = Some(end);
    }
    task.updated_at = Utc::now();

    if !tasks::update(store, &task).await? {
        return Err(ApiError::not_found("Task not found"));
    }

    state
        .hub
        .dispatch(EventType::TASK_UPDATED, &task, Audience::All);

    Ok(Json(task))
}

// ---------------------------------------------------------------------------
// PATCH /api/operations/:id/tasks/:task_id/status
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[utoipa::path(
    patch,
    path = "/api/operations/{id}/tasks/{task_id}/status",
    tag = "Tasks",
    security(("bearer" = [])),
    params(
        ("id" = String, Path, description = "Operation ID"),
        ("task_id" = String, Path, description = "Task ID"),
    ),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Task),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn update_task_status(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateTaskStatusRequest>,
) -> Result<Json<Task>, ApiError> {
    let store = state.store.as_ref();
    let mut task = load_task(store, &id, &task_id).await?;

    if task.status != body.status {
        task.status = body.status;
        task.updated_at = Utc::now();
        if !tasks::update(store, &task).await? {
            return Err(ApiError::not_found("Task not found"));
        }
        state
            .hub
            .dispatch(EventType::TASK_UPDATED, &task, Audience::All);
    }

    Ok(Json(task))
}

// ---------------------------------------------------------------------------
// DELETE /api/operations/:id/tasks/:task_id
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TaskRef<'a> {
    id: &'a str,
    operation_id: &'a str,
}

#[utoipa::path(
    delete,
    path = "/api/operations/{id}/tasks/{task_id}",
    tag = "Tasks",
    security(("bearer" = [])),
    params(
        ("id" = String, Path, description = "Operation ID"),
        ("task_id" = String, Path, description = "Task ID"),
    ),
    responses(
        (status = 204, description = "Task and its results deleted"),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_task(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    let task = load_task(store, &id, &task_id).await?;

    results::delete_by_task(store, &task.id).await?;
    if !tasks::delete(store, &task.id).await? {
        return Err(ApiError::not_found("Task not found"));
    }

    state.hub.dispatch(
        EventType::TASK_DELETED,
        &TaskRef {
            id: &task.id,
            operation_id: &task.operation_id,
        },
        Audience::All,
    );

    Ok(StatusCode::NO_CONTENT)
}
