//! PostgreSQL document store: one JSONB row per document.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::{Condition, DocumentStore, Mutation, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Value>>("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id)
            .fetch_optional(&self.pool).await?;
        Ok(row.map(|Json(v)| v))
    }

    async fn insert(&self, collection: &'static str, id: &str, doc: Value) -> Result<(), StoreError> {
        let result = sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(collection).bind(id).bind(Json(&doc))
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict { collection, id: id.to_string() });
        }
        Ok(())
    }

    async fn modify(&self, collection: &'static str, id: &str, mutation: Mutation<'_>) -> Result<Option<Value>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_scalar::<_, Json<Value>>("SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
            .bind(collection).bind(id)
            .fetch_optional(&mut *tx).await?;
        let Some(Json(mut body)) = current else {
            return Ok(None);
        };
        mutation(&mut body)?;
        sqlx::query("UPDATE documents SET body = $3, updated_at = NOW() WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).bind(Json(&body))
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(body))
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_if(&self, collection: &'static str, id: &str, condition: Condition<'_>) -> Result<Option<bool>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_scalar::<_, Json<Value>>("SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
            .bind(collection).bind(id)
            .fetch_optional(&mut *tx).await?;
        let Some(Json(body)) = current else {
            return Ok(None);
        };
        if !condition(&body)? {
            return Ok(Some(false));
        }
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(true))
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Value>>("SELECT body FROM documents WHERE collection = $1 ORDER BY created_at")
            .bind(collection)
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(v)| v).collect())
    }
}
