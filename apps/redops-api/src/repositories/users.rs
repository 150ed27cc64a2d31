use axum::http::StatusCode;
use serde_json::json;

use super::Collection;
use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::user::User;

fn users(store: &dyn DocumentStore) -> Collection<'_, User> {
    Collection::new(store)
}

pub async fn list(store: &dyn DocumentStore) -> Result<Vec<User>, ApiError> {
    users(store).all().await
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> Result<Option<User>, ApiError> {
    users(store).get(id).await
}

pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> Result<Option<User>, ApiError> {
    Ok(users(store)
        .find(json!({ "email": email }))
        .await?
        .into_iter()
        .next())
}

fn email_taken(err: ApiError) -> ApiError {
    if err.status == StatusCode::CONFLICT {
        ApiError::conflict("Email is already registered")
    } else {
        err
    }
}

/// Insert a new user. Email addresses are unique; the lookup gives the
/// common case a clear error and the store's unique index settles races.
pub async fn create(store: &dyn DocumentStore, user: &User) -> Result<(), ApiError> {
    if find_by_email(store, &user.email).await?.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }
    users(store).insert(user).await.map_err(email_taken)
}

pub async fn update(store: &dyn DocumentStore, user: &User) -> Result<bool, ApiError> {
    users(store).replace(user).await.map_err(email_taken)
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, ApiError> {
    users(store).delete(id).await
}

pub async fn count(store: &dyn DocumentStore) -> Result<u64, ApiError> {
    users(store).count().await
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use redops_common::PrefixedId;

    use super::*;
    use crate::db::store::MemoryStore;
    use crate::models::user::UserRole;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: User::generate(),
            username: email.split('@').next().unwrap_or_default().into(),
            email: email.into(),
            password_hash: String::new(),
            role: UserRole::Member,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn email_change_onto_a_taken_address_conflicts() {
        let store = MemoryStore::new();
        let alice = user("alice@redops.test");
        let mut bob = user("bob@redops.test");
        create(&store, &alice).await.unwrap();
        create(&store, &bob).await.unwrap();

        bob.email = alice.email.clone();
        let err = update(&store, &bob).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, "Email is already registered");

        let stored = get(&store, &bob.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "bob@redops.test");
    }
}
