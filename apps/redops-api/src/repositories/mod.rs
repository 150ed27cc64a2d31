//! Typed access to the document store, one module per collection.
//!
//! Each function is a single query (or a short fixed sequence of them) so
//! handlers never build filters themselves.

pub mod notifications;
pub mod operations;
pub mod results;
pub mod tasks;
pub mod tools;
pub mod users;

use std::marker::PhantomData;

use serde_json::Value;

use crate::db::store::DocumentStore;
use crate::error::ApiError;
use crate::models::Document;

/// A document store collection viewed as values of `T`.
pub struct Collection<'a, T> {
    store: &'a dyn DocumentStore,
    _doc: PhantomData<fn() -> T>,
}

impl<'a, T: Document> Collection<'a, T> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub async fn insert(&self, doc: &T) -> Result<(), ApiError> {
        let body = serde_json::to_value(doc)?;
        self.store.insert(T::COLLECTION, doc.id(), body).await
    }

    pub async fn insert_many(&self, docs: &[T]) -> Result<(), ApiError> {
        let rows = docs
            .iter()
            .map(|doc| -> Result<(String, Value), serde_json::Error> {
                Ok((doc.id().to_string(), serde_json::to_value(doc)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.insert_many(T::COLLECTION, rows).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, ApiError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    pub async fn find(&self, filter: Value) -> Result<Vec<T>, ApiError> {
        self.store
            .find(T::COLLECTION, &filter)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(ApiError::from))
            .collect()
    }

    pub async fn all(&self) -> Result<Vec<T>, ApiError> {
        self.find(Value::Object(Default::default())).await
    }

    /// Returns `false` if no document with that id exists.
    pub async fn replace(&self, doc: &T) -> Result<bool, ApiError> {
        let body = serde_json::to_value(doc)?;
        self.store.replace(T::COLLECTION, doc.id(), body).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn delete_where(&self, filter: Value) -> Result<u64, ApiError> {
        self.store.delete_many(T::COLLECTION, &filter).await
    }

    pub async fn count(&self) -> Result<u64, ApiError> {
        self.store.count(T::COLLECTION).await
    }
}
