//! Key-value persistence port.
//!
//! The sync layer persists its cache and pending-operation queues through
//! the `KeyValueStore` trait so that durable storage can be swapped for an
//! in-memory fake in tests. Values are opaque strings; the `JsonStoreExt`
//! helpers layer typed JSON encoding on top.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for durable key-value backends.
///
/// Methods take `&self`; implementations use interior mutability so one
/// store can be shared behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Whether a value exists for `key`.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Typed JSON access for any `KeyValueStore`.
pub trait JsonStoreExt {
    /// Decode the JSON value stored under `key`.
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Encode `value` as JSON and store it under `key`.
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

/// Check that a key is usable by every backend (including as a file name).
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(crate::StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: i64,
        label: String,
    }

    #[test]
    fn test_json_roundtrip_through_trait_object() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let entries = vec![Entry { id: 1, label: "a".into() }];

        store.save_json("entries", &entries).unwrap();
        let loaded: Option<Vec<Entry>> = store.load_json("entries").unwrap();
        assert_eq!(loaded, Some(entries));
    }

    #[test]
    fn test_load_missing_key() {
        let store = MemoryStore::new();
        let loaded: Option<Vec<Entry>> = store.load_json("nothing").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_value() {
        let store = MemoryStore::new();
        store.set("entries", "{not json").unwrap();
        let result: Result<Option<Vec<Entry>>> = store.load_json("entries");
        assert!(matches!(result, Err(crate::StoreError::Serialization(_))));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("pending_status_ops").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
    }
}
