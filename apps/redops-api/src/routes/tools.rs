//! Tool catalogue.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::{Audience, EventType};
use crate::models::tool::{Tool, ToolType};
use crate::repositories::tools;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tools", get(list_tools).post(create_tool))
        .route(
            "/tools/{id}",
            get(get_tool).put(update_tool).delete(delete_tool),
        )
        .route("/tools/{id}/status", patch(update_tool_status))
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateToolRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ToolType,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default)]
    pub output_format: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateToolRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ToolType>,
    pub description: Option<String>,
    pub command: Option<String>,
    pub arguments: Option<BTreeMap<String, String>>,
    pub output_format: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListToolsParams {
    #[serde(rename = "type")]
    pub kind: Option<ToolType>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/tools",
    tag = "Tools",
    security(("bearer" = [])),
    params(
        ("type" = Option<ToolType>, Query, description = "Only tools of this type"),
        ("active" = Option<bool>, Query, description = "Only enabled (true) or disabled (false) tools"),
    ),
    responses((status = 200, description = "Tools matching the filters", body = Vec<Tool>)),
)]
pub async fn list_tools(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListToolsParams>,
) -> Result<Json<Vec<Tool>>, ApiError> {
    let store = state.store.as_ref();
    let list = match (params.kind, params.active) {
        (None, None) => tools::list(store).await?,
        (kind, active) => tools::matching(store, kind, active).await?,
    };
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/api/tools",
    tag = "Tools",
    security(("bearer" = [])),
    request_body = CreateToolRequest,
    responses(
        (status = 201, description = "Tool created", body = Tool),
        (status = 400, description = "Validation error", body = ApiErrorBody),
    ),
)]
pub async fn create_tool(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateToolRequest>,
) -> Result<(StatusCode, Json<Tool>), ApiError> {
    let name = body.name.trim().to_string();
    let command = body.command.trim().to_string();

    let mut errors = Vec::new();
    super::require_name(&mut errors, "name", &name, 100);
    super::require_non_empty(&mut errors, "command", &command);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let now = Utc::now();
    let tool = Tool {
        id: Tool::generate(),
        name,
        kind: body.kind,
        description: body.description,
        command,
        arguments: body.arguments,
        output_format: body.output_format,
        is_active: body.is_active,
        created_at: now,
        updated_at: now,
    };
    tools::create(state.store.as_ref(), &tool).await?;

    state
        .hub
        .dispatch(EventType::TOOL_CREATED, &tool, Audience::All);

    Ok((StatusCode::CREATED, Json(tool)))
}

#[utoipa::path(
    get,
    path = "/api/tools/{id}",
    tag = "Tools",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tool ID")),
    responses(
        (status = 200, description = "Tool", body = Tool),
        (status = 404, description = "Tool not found", body = ApiErrorBody),
    ),
)]
pub async fn get_tool(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tool>, ApiError> {
    tools::get(state.store.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Tool not found"))
}

#[utoipa::path(
    put,
    path = "/api/tools/{id}",
    tag = "Tools",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tool ID")),
    request_body = UpdateToolRequest,
    responses(
        (status = 200, description = "Tool updated", body = Tool),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 404, description = "Tool not found", body = ApiErrorBody),
    ),
)]
pub async fn update_tool(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateToolRequest>,
) -> Result<Json<Tool>, ApiError> {
    let store = state.store.as_ref();
    let mut tool = tools::get(store, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tool not found"))?;

    let mut errors = Vec::new();
    if let Some(name) = body.name {
        tool.name = name.trim().to_string();
        super::require_name(&mut errors, "name", &tool.name, 100);
    }
    if let Some(command) = body.command {
        tool.command = command.trim().to_string();
        super::require_non_empty(&mut errors, "command", &tool.command);
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    if let Some(kind) = body.kind {
        tool.kind = kind;
    }
    if let Some(description) = body.description {
        tool.description = description;
    }
    if let Some(arguments) = body.arguments {
        tool.arguments = arguments;
    }
    if let Some(output_format) = body.output_format {
        tool.output_format = output_format;
    }
    if let Some(is_active) = body.is_active {
        tool.is_active = is_active;
    }
    tool.updated_at = Utc::now();

    if !tools::update(store, &tool).await? {
        return Err(ApiError::not_found("Tool not found"));
    }

    state
        .hub
        .dispatch(EventType::TOOL_UPDATED, &tool, Audience::All);

    Ok(Json(tool))
}

// ---------------------------------------------------------------------------
// PATCH /api/tools/:id/status
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateToolStatusRequest {
    pub is_active: bool,
}

#[utoipa::path(
    patch,
    path = "/api/tools/{id}/status",
    tag = "Tools",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tool ID")),
    request_body = UpdateToolStatusRequest,
    responses(
        (status = 200, description = "Tool enabled or disabled", body = Tool),
        (status = 404, description = "Tool not found", body = ApiErrorBody),
    ),
)]
pub async fn update_tool_status(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateToolStatusRequest>,
) -> Result<Json<Tool>, ApiError> {
    let tool = tools::set_active(state.store.as_ref(), &id, body.is_active)
        .await?
        .ok_or_else(|| ApiError::not_found("Tool not found"))?;

    state
        .hub
        .dispatch(EventType::TOOL_UPDATED, &tool, Audience::All);

    Ok(Json(tool))
}

#[derive(Debug, Serialize)]
struct ToolRef<'a> {
    id: &'a str,
}

#[utoipa::path(
    delete,
    path = "/api/tools/{id}",
    tag = "Tools",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tool ID")),
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 404, description = "Tool not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_tool(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !tools::delete(state.store.as_ref(), &id).await? {
        return Err(ApiError::not_found("Tool not found"));
    }

    state
        .hub
        .dispatch(EventType::TOOL_DELETED, &ToolRef { id: &id }, Audience::All);

    Ok(StatusCode::NO_CONTENT)
}
