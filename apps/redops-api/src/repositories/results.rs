use serde_json::json;

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::result::TaskResult;

fn results(store: &dyn DocumentStore) -> Collection<'_, TaskResult> {
    Collection::new(store)
}

pub async fn by_task(store: &dyn DocumentStore, task_id: &str) -> Result<Vec<TaskResult>, ApiError> {
    results(store).find(json!({ "taskId": task_id })).await
}

pub async fn insert_many(store: &dyn DocumentStore, rows: &[TaskResult]) -> Result<(), ApiError> {
    if rows.is_empty() {
        return Ok(());
    }
    results(store).insert_many(rows).await
}

pub async fn delete_by_task(store: &dyn DocumentStore, task_id: &str) -> Result<u64, ApiError> {
    results(store).delete_where(json!({ "taskId": task_id })).await
}
