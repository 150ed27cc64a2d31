use chrono::Utc;
use serde_json::{json, Map, Value};

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::tool::{Tool, ToolType};

fn tools(store: &dyn DocumentStore) -> Collection<'_, Tool> {
    Collection::new(store)
}

pub async fn list(store: &dyn DocumentStore) -> Result<Vec<Tool>, ApiError> {
    tools(store).all().await
}

/// Tools matching every given criterion, in creation order.
pub async fn matching(
    store: &dyn DocumentStore,
    kind: Option<ToolType>,
    active: Option<bool>,
) -> Result<Vec<Tool>, ApiError> {
    let mut filter = Map::new();
    if let Some(kind) = kind {
        filter.insert("type".into(), serde_json::to_value(kind)?);
    }
    if let Some(active) = active {
        filter.insert("is_active".into(), json!(active));
    }
    tools(store).find(Value::Object(filter)).await
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> Result<Option<Tool>, ApiError> {
    tools(store).get(id).await
}

pub async fn create(store: &dyn DocumentStore, tool: &Tool) -> Result<(), ApiError> {
    tools(store).insert(tool).await
}

pub async fn update(store: &dyn DocumentStore, tool: &Tool) -> Result<bool, ApiError> {
    tools(store).replace(tool).await
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, ApiError> {
    tools(store).delete(id).await
}

/// Enable or disable a tool. Returns the updated tool, or `None` if it does
/// not exist.
pub async fn set_active(
    store: &dyn DocumentStore,
    id: &str,
    is_active: bool,
) -> Result<Option<Tool>, ApiError> {
    let Some(mut tool) = get(store, id).await? else {
        return Ok(None);
    };
    tool.is_active = is_active;
    tool.updated_at = Utc::now();
    if !update(store, &tool).await? {
        return Ok(None);
    }
    Ok(Some(tool))
}
