//! Document store abstraction.
//!
//! Documents are JSON values keyed by collection and id. Every write targets a
//! single document and is atomic on its own; there are no cross-document
//! transactions. `Repository` layers typed access on top of a backend.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(test)]
pub(crate) use memory::flaky::FlakyStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document already exists: {collection}/{id}")]
    Conflict { collection: &'static str, id: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self { StoreError::Backend(e.to_string()) }
}

/// Mutation applied to a stored document under the backend's per-document lock.
pub type Mutation<'a> = Box<dyn FnOnce(&mut Value) -> Result<(), StoreError> + Send + 'a>;

/// Check run against a stored document under the backend's per-document lock.
pub type Condition<'a> = Box<dyn FnOnce(&Value) -> Result<bool, StoreError> + Send + 'a>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Fails with `StoreError::Conflict` if the id is taken.
    async fn insert(&self, collection: &'static str, id: &str, doc: Value) -> Result<(), StoreError>;

    /// Atomic read-modify-write. Returns the stored result, or `None` when the
    /// document does not exist (the mutation is not called).
    async fn modify(&self, collection: &'static str, id: &str, mutation: Mutation<'_>) -> Result<Option<Value>, StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError>;

    /// Removes the document only if `condition` holds. `None` when the
    /// document does not exist, otherwise whether it was removed.
    async fn delete_if(&self, collection: &'static str, id: &str, condition: Condition<'_>) -> Result<Option<bool>, StoreError>;

    async fn list(&self, collection: &'static str) -> Result<Vec<Value>, StoreError>;
}

/// A type persisted as one document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    fn document_id(&self) -> String;
}

/// Typed access to a `DocumentStore`.
#[derive(Clone)]
pub struct Repository {
    backend: std::sync::Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(backend: std::sync::Arc<dyn DocumentStore>) -> Self { Self { backend } }

    pub fn in_memory() -> Self { Self::new(std::sync::Arc::new(MemoryStore::new())) }

    pub async fn find<T: Document>(&self, id: &impl ToString) -> Result<Option<T>, StoreError> {
        match self.backend.get(T::COLLECTION, &id.to_string()).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    pub async fn insert<T: Document>(&self, doc: &T) -> Result<(), StoreError> {
        self.backend.insert(T::COLLECTION, &doc.document_id(), serde_json::to_value(doc)?).await
    }

    /// Applies `f` to the stored document atomically. `f`'s output is returned
    /// alongside the updated document; `None` when the document is absent.
    pub async fn update<T, F, R>(&self, id: &impl ToString, f: F) -> Result<Option<(T, R)>, StoreError>
    where
        T: Document,
        F: FnOnce(&mut T) -> R + Send,
        R: Send,
    {
        let mut output = None;
        let slot = &mut output;
        let stored = self.backend.modify(T::COLLECTION, &id.to_string(), Box::new(move |value: &mut Value| {
            let mut doc: T = serde_json::from_value(value.clone())?;
            *slot = Some(f(&mut doc));
            *value = serde_json::to_value(&doc)?;
            Ok(())
        })).await?;
        match (stored, output) {
            (Some(v), Some(out)) => Ok(Some((serde_json::from_value(v)?, out))),
            _ => Ok(None),
        }
    }

    /// Like `update` for fallible domain operations. An `Err` from `f` leaves
    /// the document untouched.
    pub async fn try_update<T, F, E>(&self, id: &impl ToString, f: F) -> Result<Option<Result<T, E>>, StoreError>
    where
        T: Document,
        F: FnOnce(&mut T) -> Result<(), E> + Send,
        E: Send,
    {
        let mut failure = None;
        let slot = &mut failure;
        let stored = self.backend.modify(T::COLLECTION, &id.to_string(), Box::new(move |value: &mut Value| {
            let mut doc: T = serde_json::from_value(value.clone())?;
            match f(&mut doc) {
                Ok(()) => { *value = serde_json::to_value(&doc)?; }
                Err(e) => { *slot = Some(e); }
            }
            Ok(())
        })).await?;
        if let Some(e) = failure { return Ok(Some(Err(e))); }
        match stored {
            Some(v) => Ok(Some(Ok(serde_json::from_value(v)?))),
            None => Ok(None),
        }
    }

    pub async fn delete<T: Document>(&self, id: &impl ToString) -> Result<bool, StoreError> {
        self.backend.delete(T::COLLECTION, &id.to_string()).await
    }

    pub async fn delete_if<T, F>(&self, id: &impl ToString, condition: F) -> Result<Option<bool>, StoreError>
    where
        T: Document,
        F: FnOnce(&T) -> bool + Send,
    {
        self.backend
            .delete_if(T::COLLECTION, &id.to_string(), Box::new(move |value: &Value| {
                let doc: T = serde_json::from_value(value.clone())?;
                Ok(condition(&doc))
            }))
            .await
    }

    pub async fn all<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        self.backend
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    pub async fn find_where<T: Document>(&self, pred: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        Ok(self.all::<T>().await?.into_iter().filter(|d| pred(d)).collect())
    }
}

mod documents {
    use super::Document;
    use crate::domain::aggregates::{Address, Category, DeliveryPerson, Order, Product, Rating, User};

    macro_rules! document {
        ($ty:ty, $collection:literal) => {
            impl Document for $ty {
                const COLLECTION: &'static str = $collection;
                fn document_id(&self) -> String { self.id().to_string() }
            }
        };
    }

    document!(User, "users");
    document!(Product, "products");
    document!(Address, "addresses");
    document!(Order, "orders");
    document!(Rating, "ratings");
    document!(DeliveryPerson, "delivery_persons");
    document!(Category, "categories");
}
