//! In-memory key-value store.
//!
//! Used by tests and by hosts that do not need persistence across restarts.

use crate::error::{Result, StoreError};
use crate::kv::{validate_key, KeyValueStore};
use std::collections::HashMap;
use std::sync::RwLock;

/// `KeyValueStore` backed by a `HashMap` behind a `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key.
    pub fn clear(&self) -> Result<()> {
        self.values
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("oneoffs", "[]").unwrap();
        assert_eq!(store.get("oneoffs").unwrap().as_deref(), Some("[]"));
        assert!(store.contains("oneoffs").unwrap());
        assert_eq!(store.len(), 1);

        store.set("oneoffs", "[1]").unwrap();
        assert_eq!(store.get("oneoffs").unwrap().as_deref(), Some("[1]"));

        store.remove("oneoffs").unwrap();
        assert!(store.get("oneoffs").unwrap().is_none());
        store.remove("oneoffs").unwrap();
    }

    #[test]
    fn test_rejects_invalid_key() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("a/b", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
