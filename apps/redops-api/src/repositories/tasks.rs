use serde_json::json;

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::task::Task;

fn tasks(store: &dyn DocumentStore) -> Collection<'_, Task> {
    Collection::new(store)
}

pub async fn by_operation(store: &dyn DocumentStore, operation_id: &str) -> Result<Vec<Task>, ApiError> {
    tasks(store).find(json!({ "operation_id": operation_id })).await
}

/// Tasks assigned to the user across all operations, in creation order.
pub async fn assigned_to(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<Task>, ApiError> {
    tasks(store).find(json!({ "assigned_to": user_id })).await
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> Result<Option<Task>, ApiError> {
    tasks(store).get(id).await
}

/// Look up a task, treating one that belongs to another operation as absent.
pub async fn get_in_operation(
    store: &dyn DocumentStore,
    operation_id: &str,
    task_id: &str,
) -> Result<Option<Task>, ApiError> {
    Ok(get(store, task_id)
        .await?
        .filter(|t| t.operation_id == operation_id))
}

pub async fn create(store: &dyn DocumentStore, task: &Task) -> Result<(), ApiError> {
    tasks(store).insert(task).await
}

pub async fn update(store: &dyn DocumentStore, task: &Task) -> Result<bool, ApiError> {
    tasks(store).replace(task).await
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, ApiError> {
    tasks(store).delete(id).await
}

pub async fn delete_by_operation(store: &dyn DocumentStore, operation_id: &str) -> Result<u64, ApiError> {
    tasks(store)
        .delete_where(json!({ "operation_id": operation_id }))
        .await
}
