//! [`DocumentStore`] over a single PostgreSQL `documents` table, one JSONB
//! body per row, filtered with `@>`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::db::pool::DbPool;
use crate::db::schema::documents;
use crate::db::store::DocumentStore;
use crate::error::ApiError;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Both the primary key and the unique email index surface as 409.
fn map_write_error(err: DieselError) -> ApiError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ApiError::conflict("Document already exists")
        }
        other => other.into(),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(documents::table)
            .values((
                documents::collection.eq(collection),
                documents::id.eq(id),
                documents::body.eq(doc),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), ApiError> {
        if docs.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await?;

        let rows: Vec<_> = docs
            .into_iter()
            .map(|(id, body)| {
                (
                    documents::collection.eq(collection),
                    documents::id.eq(id),
                    documents::body.eq(body),
                )
            })
            .collect();

        // One statement, so the batch lands atomically and keeps its order in `seq`.
        diesel::insert_into(documents::table)
            .values(rows)
            .execute(&mut conn)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ApiError> {
        let mut conn = self.pool.get().await?;

        let body = documents::table
            .find((collection, id))
            .select(documents::body)
            .first::<Value>(&mut conn)
            .await
            .optional()?;
        Ok(body)
    }

    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>, ApiError> {
        let mut conn = self.pool.get().await?;

        let bodies = documents::table
            .filter(documents::collection.eq(collection))
            .filter(documents::body.contains(filter.clone()))
            .order(documents::seq.asc())
            .select(documents::body)
            .load::<Value>(&mut conn)
            .await?;
        Ok(bodies)
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(documents::table.find((collection, id)))
            .set((
                documents::body.eq(doc),
                documents::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_write_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(documents::table.find((collection, id)))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &Value) -> Result<u64, ApiError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(
            documents::table
                .filter(documents::collection.eq(collection))
                .filter(documents::body.contains(filter.clone())),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted as u64)
    }

    async fn count(&self, collection: &str) -> Result<u64, ApiError> {
        let mut conn = self.pool.get().await?;

        let n: i64 = documents::table
            .filter(documents::collection.eq(collection))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(n as u64)
    }
}
