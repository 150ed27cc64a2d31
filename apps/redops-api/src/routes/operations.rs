//! Operation CRUD and phase tracking.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::gateway::{Audience, EventType};
use crate::models::operation::{Operation, OperationDetail, OperationPhase, OperationType};
use crate::models::user::UserResponse;
use crate::repositories::{operations, results, tasks, users};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/operations", get(list_operations).post(create_operation))
        .route(
            "/operations/{id}",
            get(get_operation)
                .put(update_operation)
                .delete(delete_operation),
        )
        .route("/operations/{id}/phase", patch(update_phase))
}

fn validate_dates(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    errors: &mut Vec<FieldError>,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.push(FieldError {
                field: "end_date".to_string(),
                message: "End date must not be before start date".to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/operations
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/operations",
    tag = "Operations",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All operations", body = Vec<Operation>),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_operations(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Operation>>, ApiError> {
    Ok(Json(operations::list(state.store.as_ref()).await?))
}

// ---------------------------------------------------------------------------
// POST /api/operations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOperationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub roe: String,
    /// Defaults to the caller.
    pub team_lead: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    pub current_phase: Option<OperationPhase>,
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/operations",
    tag = "Operations",
    security(("bearer" = [])),
    request_body = CreateOperationRequest,
    responses(
        (status = 201, description = "Operation created", body = Operation),
        (status = 400, description = "Validation error", body = ApiErrorBody),
    ),
)]
pub async fn create_operation(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateOperationRequest>,
) -> Result<(StatusCode, Json<Operation>), ApiError> {
    let store = state.store.as_ref();
    let name = body.name.trim().to_string();
    let team_lead = body.team_lead.unwrap_or(user_id);
    let members = super::unique(body.members);

    let mut errors = Vec::new();
    super::require_name(&mut errors, "name", &name, 200);
    super::require_users(store, &mut errors, "team_lead", std::slice::from_ref(&team_lead)).await?;
    super::require_users(store, &mut errors, "members", &members).await?;
    validate_dates(body.start_date, body.end_date, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let now = Utc::now();
    let op = Operation {
        id: Operation::generate(),
        name,
        kind: body.kind,
        description: body.description,
        scope: body.scope,
        roe: body.roe,
        team_lead,
        members,
        current_phase: body.current_phase.unwrap_or_default(),
        status: body.status.unwrap_or_else(|| "planning".to_string()),
        start_date: body.start_date,
        end_date: body.end_date,
        created_at: now,
        updated_at: now,
    };
    operations::create(store, &op).await?;

    state
        .hub
        .dispatch(EventType::OPERATION_CREATED, &op, Audience::All);

    Ok((StatusCode::CREATED, Json(op)))
}

// ---------------------------------------------------------------------------
// GET /api/operations/:id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/operations/{id}",
    tag = "Operations",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    responses(
        (status = 200, description = "Operation with team and tasks", body = OperationDetail),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn get_operation(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OperationDetail>, ApiError> {
    let store = state.store.as_ref();
    let op = operations::get(store, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;

    let team_lead = users::get(store, &op.team_lead).await?.map(UserResponse::from);
    let mut members = Vec::with_capacity(op.members.len());
    for member_id in &op.members {
        // Deleted accounts drop out of the roster.
        if let Some(member) = users::get(store, member_id).await? {
            members.push(member.into());
        }
    }
    let op_tasks = tasks::by_operation(store, &op.id).await?;

    Ok(Json(OperationDetail::new(op, team_lead, members, op_tasks)))
}

// ---------------------------------------------------------------------------
// PUT /api/operations/:id
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOperationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<OperationType>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub roe: Option<String>,
    pub team_lead: Option<String>,
    pub members: Option<Vec<String>>,
    pub current_phase: Option<OperationPhase>,
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    put,
    path = "/api/operations/{id}",
    tag = "Operations",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    request_body = UpdateOperationRequest,
    responses(
        (status = 200, description = "Operation updated", body = Operation),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn update_operation(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateOperationRequest>,
) -> Result<Json<Operation>, ApiError> {
    let store = state.store.as_ref();
    let mut op = operations::get(store, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;

    let mut errors = Vec::new();
    if let Some(name) = body.name {
        op.name = name.trim().to_string();
        super::require_name(&mut errors, "name", &op.name, 200);
    }
    if let Some(team_lead) = body.team_lead {
        super::require_users(store, &mut errors, "team_lead", std::slice::from_ref(&team_lead))
            .await?;
        op.team_lead = team_lead;
    }
    if let Some(members) = body.members {
        let members = super::unique(members);
        super::require_users(store, &mut errors, "members", &members).await?;
        op.members = members;
    }
    if let Some(start) = body.start_date {
        op.start_date = Some(start);
    }
    if let Some(end) = body.end_date {
        op.end_date = Some(end);
    }
    validate_dates(op.start_date, op.end_date, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    if let Some(kind) = body.kind {
        op.kind = kind;
    }
    if let Some(description) = body.description {
        op.description = description;
    }
    if let Some(scope) = body.scope {
        op.scope = scope;
    }
    if let Some(roe) = body.roe {
        op.roe = roe;
    }
    if let Some(phase) = body.current_phase {
        op.current_phase = phase;
    }
    if let Some(status) = body.status {
        op.status = status;
    }
    op.updated_at = Utc::now();

    if !operations::update(store, &op).await? {
        return Err(ApiError::not_found("Operation not found"));
    }

    state
        .hub
        .dispatch(EventType::OPERATION_UPDATED, &op, Audience::All);

    Ok(Json(op))
}

// ---------------------------------------------------------------------------
// DELETE /api/operations/:id
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OperationRef<'a> {
    id: &'a str,
}

#[utoipa::path(
    delete,
    path = "/api/operations/{id}",
    tag = "Operations",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    responses(
        (status = 204, description = "Operation, its tasks and their results deleted"),
        (status = 403, description = "Only the team lead or an admin may delete", body = ApiErrorBody),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_operation(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    let op = operations::get(store, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;
    if !caller.is_admin() && op.team_lead != caller.user_id {
        return Err(ApiError::forbidden(
            "Only the team lead or an admin may delete an operation",
        ));
    }

    for task in tasks::by_operation(store, &op.id).await? {
        results::delete_by_task(store, &task.id).await?;
    }
    let removed_tasks = tasks::delete_by_operation(store, &op.id).await?;
    if !operations::delete(store, &op.id).await? {
        return Err(ApiError::not_found("Operation not found"));
    }

    tracing::info!(operation_id = %op.id, removed_tasks, "operation deleted");
    state.hub.dispatch(
        EventType::OPERATION_DELETED,
        &OperationRef { id: &op.id },
        Audience::All,
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PATCH /api/operations/:id/phase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePhaseRequest {
    pub phase: OperationPhase,
}

#[derive(Debug, Serialize)]
struct PhaseChanged<'a> {
    id: &'a str,
    current_phase: OperationPhase,
}

#[utoipa::path(
    patch,
    path = "/api/operations/{id}/phase",
    tag = "Operations",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Operation ID")),
    request_body = UpdatePhaseRequest,
    responses(
        (status = 200, description = "Phase updated", body = Operation),
        (status = 404, description = "Operation not found", body = ApiErrorBody),
    ),
)]
pub async fn update_phase(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePhaseRequest>,
) -> Result<Json<Operation>, ApiError> {
    let op = operations::set_phase(state.store.as_ref(), &id, body.phase)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;

    state.hub.dispatch(
        EventType::OPERATION_PHASE_CHANGED,
        &PhaseChanged {
            id: &op.id,
            current_phase: op.current_phase,
        },
        Audience::All,
    );

    Ok(Json(op))
}
