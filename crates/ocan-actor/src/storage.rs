// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-actor key-value storage.
//!
//! Per the concurrency model, per-actor storage is writable only by that
//! actor. This trait is the seam between the runtime logic in this crate
//! and whatever durable backing store a deployment plugs in; [`InMemoryStorage`]
//! is the reference implementation used by tests and a single-process
//! daemon.

use ocan_error::{ErrorCode, OcanError, OcanResult};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Namespaced key-value storage scoped to one actor instance.
pub trait ActorStorage: Send + Sync {
    /// Read a value by exact key.
    fn get(&self, key: &str) -> OcanResult<Option<serde_json::Value>>;

    /// Write a value at `key`, overwriting any existing value.
    fn put(&self, key: &str, value: serde_json::Value) -> OcanResult<()>;

    /// Remove `key`, if present.
    fn delete(&self, key: &str) -> OcanResult<()>;

    /// List all `(key, value)` pairs whose key starts with `prefix`, in key
    /// order.
    fn list_prefix(&self, prefix: &str) -> OcanResult<Vec<(String, serde_json::Value)>>;
}

/// In-memory reference [`ActorStorage`], backed by a sorted map so
/// `list_prefix` returns a stable order.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl InMemoryStorage {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActorStorage for InMemoryStorage {
    fn get(&self, key: &str) -> OcanResult<Option<serde_json::Value>> {
        Ok(self.data.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn put(&self, key: &str, value: serde_json::Value) -> OcanResult<()> {
        self.data
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> OcanResult<()> {
        self.data.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    fn list_prefix(&self, prefix: &str) -> OcanResult<Vec<(String, serde_json::Value)>> {
        Ok(self
            .data
            .read()
            .map_err(|_| poisoned())?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

fn poisoned() -> OcanError {
    OcanError::new(ErrorCode::ToolExecution, "actor storage lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = InMemoryStorage::new();
        store.put("a", serde_json::json!(1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(serde_json::json!(1)));
    }

    #[test]
    fn list_prefix_is_scoped_and_ordered() {
        let store = InMemoryStorage::new();
        store.put("queue:t:2", serde_json::json!("b")).unwrap();
        store.put("queue:t:1", serde_json::json!("a")).unwrap();
        store.put("other:1", serde_json::json!("z")).unwrap();
        let items = store.list_prefix("queue:t:").unwrap();
        assert_eq!(
            items,
            vec![
                ("queue:t:1".to_string(), serde_json::json!("a")),
                ("queue:t:2".to_string(), serde_json::json!("b")),
            ]
        );
    }

    #[test]
    fn delete_removes_key() {
        let store = InMemoryStorage::new();
        store.put("a", serde_json::json!(1)).unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
