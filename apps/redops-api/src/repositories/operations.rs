use chrono::Utc;
use serde_json::json;

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::operation::{Operation, OperationPhase};

fn operations(store: &dyn DocumentStore) -> Collection<'_, Operation> {
    Collection::new(store)
}

pub async fn list(store: &dyn DocumentStore) -> Result<Vec<Operation>, ApiError> {
    operations(store).all().await
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> Result<Option<Operation>, ApiError> {
    operations(store).get(id).await
}

/// Operations the user leads or is a member of, oldest first.
pub async fn for_member(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<Operation>, ApiError> {
    let mut ops = operations(store).find(json!({ "team_lead": user_id })).await?;
    for op in operations(store).find(json!({ "members": [user_id] })).await? {
        if !ops.iter().any(|o| o.id == op.id) {
            ops.push(op);
        }
    }
    ops.sort_by_key(|o| o.created_at);
    Ok(ops)
}

pub async fn create(store: &dyn DocumentStore, op: &Operation) -> Result<(), ApiError> {
    operations(store).insert(op).await
}

pub async fn update(store: &dyn DocumentStore, op: &Operation) -> Result<bool, ApiError> {
    operations(store).replace(op).await
}

/// Move an operation to `phase`. Returns the updated operation, or `None`
/// if it does not exist.
pub async fn set_phase(
    store: &dyn DocumentStore,
    id: &str,
    phase: OperationPhase,
) -> Result<Option<Operation>, ApiError> {
    let Some(mut op) = get(store, id).await? else {
        return Ok(None);
    };
    op.current_phase = phase;
    op.updated_at = Utc::now();
    if !update(store, &op).await? {
        return Ok(None);
    }
    Ok(Some(op))
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, ApiError> {
    operations(store).delete(id).await
}
