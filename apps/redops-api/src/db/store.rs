use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::ApiError;

/// Abstraction over the document store behind the repositories.
///
/// Documents are JSON objects grouped by collection and addressed by id.
/// Filters are JSON objects matched by containment: a document matches when
/// every field in the filter is present with an equal (or, for arrays and
/// nested objects, contained) value. Query results come back in insertion
/// order.
///
/// Backed by PostgreSQL JSONB in production and an in-memory map in tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), ApiError>;
    async fn insert_many(&self, collection: &str, docs: Vec<(String, Value)>)
        -> Result<(), ApiError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ApiError>;
    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>, ApiError>;
    /// Replace a whole document. Returns `false` if it does not exist.
    async fn replace(&self, collection: &str, id: &str, doc: Value) -> Result<bool, ApiError>;
    /// Returns `false` if the document did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, ApiError>;
    async fn delete_many(&self, collection: &str, filter: &Value) -> Result<u64, ApiError>;
    async fn count(&self, collection: &str) -> Result<u64, ApiError>;
}

/// JSON containment with PostgreSQL `@>` semantics.
pub fn json_contains(doc: &Value, filter: &Value) -> bool {
    match (doc, filter) {
        (Value::Object(doc), Value::Object(filter)) => filter
            .iter()
            .all(|(key, want)| doc.get(key).is_some_and(|have| json_contains(have, want))),
        (Value::Array(doc), Value::Array(filter)) => filter
            .iter()
            .all(|want| doc.iter().any(|have| json_contains(have, want))),
        // A bare scalar filter matches an array holding it.
        (Value::Array(doc), scalar) if !scalar.is_object() => doc.iter().any(|have| have == scalar),
        (have, want) => have == want,
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for local dev / tests)
// ---------------------------------------------------------------------------

/// Body fields unique within a collection. Mirrors the partial unique
/// indexes in `migrations/`; a null or missing value never collides.
const UNIQUE_FIELDS: &[(&str, &str)] = &[("users", "email")];

/// Whether `doc` would share a unique field value with a document other
/// than `id` in `docs`.
fn collides(collection: &str, docs: &[(String, Value)], id: &str, doc: &Value) -> bool {
    UNIQUE_FIELDS
        .iter()
        .filter(|(c, _)| *c == collection)
        .any(|(_, field)| {
            let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
                return false;
            };
            docs.iter()
                .any(|(other, existing)| other != id && existing.get(*field) == Some(value))
        })
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<(String, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), ApiError> {
        let mut collections = self.collections.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|(existing, _)| existing == id) || collides(collection, docs, id, &doc) {
            return Err(ApiError::conflict("Document already exists"));
        }
        docs.push((id.to_string(), doc));
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.lock();
        let existing = collections.entry(collection.to_string()).or_default();
        // Check the batch against itself too; nothing lands unless all of it does.
        let mut staged = existing.clone();
        for (id, doc) in &docs {
            if staged.iter().any(|(other, _)| other == id) || collides(collection, &staged, id, doc) {
                return Err(ApiError::conflict("Document already exists"));
            }
            staged.push((id.clone(), doc.clone()));
        }
        *existing = staged;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ApiError> {
        Ok(self.collections.lock().get(collection).and_then(|docs| {
            docs.iter()
                .find(|(existing, _)| existing == id)
                .map(|(_, doc)| doc.clone())
        }))
    }

    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>, ApiError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| json_contains(doc, filter))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> Result<bool, ApiError> {
        let mut collections = self.collections.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        if collides(collection, docs, id, &doc) {
            return Err(ApiError::conflict("Document already exists"));
        }
        match docs.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, current)) => {
                *current = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, ApiError> {
        let mut collections = self.collections.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|(existing, _)| existing != id);
        Ok(docs.len() != before)
    }

    async fn delete_many(&self, collection: &str, filter: &Value) -> Result<u64, ApiError> {
        let mut collections = self.collections.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|(_, doc)| !json_contains(doc, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str) -> Result<u64, ApiError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }
}
