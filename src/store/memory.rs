//! In-memory document store used for local runs and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Condition, DocumentStore, Mutation, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.collections.read().await.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn insert(&self, collection: &'static str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::Conflict { collection, id: id.to_string() });
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn modify(&self, collection: &'static str, id: &str, mutation: Mutation<'_>) -> Result<Option<Value>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(slot) = guard.get_mut(collection).and_then(|c| c.get_mut(id)) else {
            return Ok(None);
        };
        let mut working = slot.clone();
        mutation(&mut working)?;
        *slot = working.clone();
        Ok(Some(working))
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.get_mut(collection).and_then(|c| c.remove(id)).is_some())
    }

    async fn delete_if(&self, collection: &'static str, id: &str, condition: Condition<'_>) -> Result<Option<bool>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        let Some(doc) = docs.get(id) else {
            return Ok(None);
        };
        if !condition(doc)? {
            return Ok(Some(false));
        }
        docs.remove(id);
        Ok(Some(true))
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<Value>, StoreError> {
        Ok(self.collections.read().await.get(collection).map(|c| c.values().cloned().collect()).unwrap_or_default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_mutation_leaves_document() {
        let store = MemoryStore::new();
        store.insert("orders", "a", json!({ "isPaid": false })).await.unwrap();
        let result = store
            .modify("orders", "a", Box::new(|v: &mut Value| {
                v["isPaid"] = json!(true);
                Err(StoreError::Backend("boom".into()))
            }))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("orders", "a").await.unwrap().unwrap()["isPaid"], false);
    }

    #[tokio::test]
    async fn test_modify_missing_is_none() {
        let store = MemoryStore::new();
        let out = store.modify("orders", "nope", Box::new(|_: &mut Value| Ok(()))).await.unwrap();
        assert!(out.is_none());
        assert!(store.list("orders").await.unwrap().is_empty());
    }
}
