use chrono::Utc;
use serde_json::json;

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::notification::Notification;

fn notifications(store: &dyn DocumentStore) -> Collection<'_, Notification> {
    Collection::new(store)
}

/// The user's own notifications plus those addressed to everyone, oldest
/// first, each as that user sees it.
pub async fn visible_to(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<Notification>, ApiError> {
    let mut list = notifications(store).find(json!({ "user_id": user_id })).await?;
    list.extend(broadcasts(store).await?);
    list.sort_by_key(|n| n.created_at);
    Ok(list.into_iter().map(|n| n.viewed_by(user_id)).collect())
}

async fn broadcasts(store: &dyn DocumentStore) -> Result<Vec<Notification>, ApiError> {
    notifications(store).find(json!({ "user_id": null })).await
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> Result<Option<Notification>, ApiError> {
    notifications(store).get(id).await
}

pub async fn create(store: &dyn DocumentStore, notification: &Notification) -> Result<(), ApiError> {
    notifications(store).insert(notification).await
}

/// Record that `user_id` read the notification. A broadcast notification
/// gains a reader; a targeted one flips its flag. Returns the reader's view.
pub async fn mark_read(
    store: &dyn DocumentStore,
    mut notification: Notification,
    user_id: &str,
) -> Result<Notification, ApiError> {
    if !notification.is_read_by(user_id) {
        if notification.is_broadcast() {
            notification.read_by.push(user_id.to_string());
        } else {
            notification.read = true;
        }
        notification.updated_at = Utc::now();
        notifications(store).replace(&notification).await?;
    }
    Ok(notification.viewed_by(user_id))
}

/// Mark everything the user can see as read, broadcasts included. Returns
/// how many changed.
pub async fn mark_all_read(store: &dyn DocumentStore, user_id: &str) -> Result<u64, ApiError> {
    let mut unread = notifications(store)
        .find(json!({ "user_id": user_id, "read": false }))
        .await?;
    unread.extend(
        broadcasts(store)
            .await?
            .into_iter()
            .filter(|n| !n.is_read_by(user_id)),
    );

    let now = Utc::now();
    let mut changed = 0;
    for mut n in unread {
        if n.is_broadcast() {
            n.read_by.push(user_id.to_string());
        } else {
            n.read = true;
        }
        n.updated_at = now;
        if notifications(store).replace(&n).await? {
            changed += 1;
        }
    }
    Ok(changed)
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, ApiError> {
    notifications(store).delete(id).await
}
