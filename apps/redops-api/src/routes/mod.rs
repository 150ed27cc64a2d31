pub mod auth;
pub mod health;
pub mod notifications;
pub mod operations;
pub mod results;
pub mod tasks;
pub mod tools;
pub mod users;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::db::store::DocumentStore;
use crate::error::{ApiError, FieldError};
use crate::repositories;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api",
            auth::router()
                .merge(users::router())
                .merge(operations::router())
                .merge(tasks::router())
                .merge(tools::router())
                .merge(results::router())
                .merge(notifications::router()),
        )
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn require_non_empty(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError {
            field: field.to_string(),
            message: format!("{field} is required"),
        });
    }
}

fn require_name(errors: &mut Vec<FieldError>, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errors.push(FieldError {
            field: field.to_string(),
            message: format!("{field} is required"),
        });
    } else if value.chars().count() > max {
        errors.push(FieldError {
            field: field.to_string(),
            message: format!("{field} must be {max} characters or fewer"),
        });
    }
}

/// Record a field error for every id that does not name an existing user.
async fn require_users(
    store: &dyn DocumentStore,
    errors: &mut Vec<FieldError>,
    field: &str,
    ids: &[String],
) -> Result<(), ApiError> {
    for id in ids {
        if repositories::users::get(store, id).await?.is_none() {
            errors.push(FieldError {
                field: field.to_string(),
                message: format!("Unknown user {id}"),
            });
        }
    }
    Ok(())
}

/// Drop repeated ids, keeping first occurrences in order.
fn unique(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::login,
        auth::register,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::list_user_operations,
        users::list_user_tasks,
        // Operations
        operations::list_operations,
        operations::create_operation,
        operations::get_operation,
        operations::update_operation,
        operations::delete_operation,
        operations::update_phase,
        // Tasks
        tasks::list_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::update_task,
        tasks::update_task_status,
        tasks::delete_task,
        // Tools
        tools::list_tools,
        tools::create_tool,
        tools::get_tool,
        tools::update_tool,
        tools::update_tool_status,
        tools::delete_tool,
        // Results
        results::list_results,
        results::import_results,
        results::delete_results,
        // Notifications
        notifications::list_notifications,
        notifications::create_notification,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::user::UserResponse,
            crate::models::user::UserRole,
            crate::models::operation::Operation,
            crate::models::operation::OperationDetail,
            crate::models::operation::OperationType,
            crate::models::operation::OperationPhase,
            crate::models::task::Task,
            crate::models::task::TaskStatus,
            crate::models::tool::Tool,
            crate::models::tool::ToolType,
            crate::models::result::ResultRow,
            crate::models::result::TaskResult,
            crate::models::notification::Notification,
            crate::models::notification::NotificationKind,
            // Route request/response types
            health::HealthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            users::UpdateUserRequest,
            operations::CreateOperationRequest,
            operations::UpdateOperationRequest,
            operations::UpdatePhaseRequest,
            tasks::CreateTaskRequest,
            tasks::UpdateTaskRequest,
            tasks::UpdateTaskStatusRequest,
            tools::CreateToolRequest,
            tools::UpdateToolRequest,
            tools::UpdateToolStatusRequest,
            results::ResultsChanged,
            notifications::CreateNotificationRequest,
            notifications::MarkAllReadResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Login and registration"),
        (name = "Users", description = "User directory"),
        (name = "Operations", description = "Engagements and their phases"),
        (name = "Tasks", description = "Tasks within an operation"),
        (name = "Tools", description = "Tool catalogue"),
        (name = "Results", description = "Task result rows"),
        (name = "Notifications", description = "Notifications, also pushed over /ws"),
    )
)]
pub struct ApiDoc;
