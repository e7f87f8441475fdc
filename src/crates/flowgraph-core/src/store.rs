//! Key-value persistence for session state.
//!
//! The [`Store`] trait is the seam between graph workflows and their session
//! backing store. The in-memory implementation covers single-process use and
//! tests; a durable backend slots in without touching callers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;

/// Async key-value store for JSON session state.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the value for `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite the value for `key`.
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All stored keys, in unspecified order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Process-local store backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemoryStore::new();
        store.put("session:1", json!({"turns": 2})).await.unwrap();
        assert_eq!(
            store.get("session:1").await.unwrap(),
            Some(json!({"turns": 2}))
        );
        store.delete("session:1").await.unwrap();
        assert_eq!(store.get("session:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = InMemoryStore::new();
        assert!(store.delete("ghost").await.is_ok());
    }

    #[tokio::test]
    async fn list_keys_returns_all() {
        let store = InMemoryStore::new();
        store.put("a", json!(1)).await.unwrap();
        store.put("b", json!(2)).await.unwrap();
        let mut keys = store.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, ["a", "b"]);
    }
}
