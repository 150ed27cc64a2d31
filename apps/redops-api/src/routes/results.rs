//! Structured task results (engagement log rows).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use redops_common::PrefixedId;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::{Audience, EventType};
use crate::models::result::{ResultRow, TaskResult};
use crate::models::task::Task;
use crate::repositories::{results, tasks};
use crate::AppState;

/// Upper bound on rows accepted by one import.
pub const MAX_IMPORT_ROWS: usize = 5000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tasks/{task_id}/results",
            get(list_results).delete(delete_results),
        )
        .route("/tasks/{task_id}/results/import", post(import_results))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResultsChanged {
    pub task_id: String,
    pub count: u64,
}

async fn ensure_task(state: &AppState, task_id: &str) -> Result<(), ApiError> {
    if !Task::is_valid_id(task_id) {
        return Err(ApiError::not_found("Task not found"));
    }
    match tasks::get(state.store.as_ref(), task_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Task not found")),
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}/results",
    tag = "Results",
    security(("bearer" = [])),
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Result rows in import order", body = Vec<TaskResult>),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn list_results(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<TaskResult>>, ApiError> {
    ensure_task(&state, &task_id).await?;
    Ok(Json(results::by_task(state.store.as_ref(), &task_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/tasks/{task_id}/results/import",
    tag = "Results",
    security(("bearer" = [])),
    params(("task_id" = String, Path, description = "Task ID")),
    request_body = Vec<ResultRow>,
    responses(
        (status = 200, description = "All results of the task after the import", body = Vec<TaskResult>),
        (status = 400, description = "Too many rows", body = ApiErrorBody),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn import_results(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(rows): Json<Vec<ResultRow>>,
) -> Result<Json<Vec<TaskResult>>, ApiError> {
    ensure_task(&state, &task_id).await?;
    if rows.len() > MAX_IMPORT_ROWS {
        return Err(ApiError::invalid_field(
            "rows",
            format!("At most {MAX_IMPORT_ROWS} rows per import"),
        ));
    }

    let now = Utc::now();
    // Blank spreadsheet lines carry nothing worth storing.
    let imported: Vec<TaskResult> = rows
        .into_iter()
        .filter(|row| !row.is_empty())
        .map(|row| TaskResult {
            id: TaskResult::generate(),
            task_id: task_id.clone(),
            row,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let store = state.store.as_ref();
    results::insert_many(store, &imported).await?;

    tracing::info!(%task_id, rows = imported.len(), "results imported");
    state.hub.dispatch(
        EventType::RESULTS_IMPORTED,
        &ResultsChanged {
            task_id: task_id.clone(),
            count: imported.len() as u64,
        },
        Audience::All,
    );

    Ok(Json(results::by_task(store, &task_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}/results",
    tag = "Results",
    security(("bearer" = [])),
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Number of rows removed", body = ResultsChanged),
        (status = 404, description = "Task not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_results(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<(StatusCode, Json<ResultsChanged>), ApiError> {
    ensure_task(&state, &task_id).await?;
    let count = results::delete_by_task(state.store.as_ref(), &task_id).await?;

    let changed = ResultsChanged { task_id, count };
    state
        .hub
        .dispatch(EventType::RESULTS_DELETED, &changed, Audience::All);

    Ok((StatusCode::OK, Json(changed)))
}
