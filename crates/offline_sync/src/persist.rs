//! Persisted keys and (de)serialization of sync state.
//!
//! Write failures are logged and swallowed: the in-memory state stays
//! authoritative and the next mutation or drain rewrites the key. Corrupt
//! values are logged and treated as absent.

use crate::cache::CacheSnapshot;
use crate::operation::{OneOffOp, StatusOp};
use crate::queue::{OneOffQueue, StatusQueue};
use serde::de::DeserializeOwned;
use store::{JsonStoreExt, KeyValueStore};
use task_model::{Category, OneOffTodo, TodoWithCategory};

pub const CATEGORIES_KEY: &str = "categories";
pub const RECOMMENDED_KEY: &str = "recommended_todos";
pub const ONEOFFS_KEY: &str = "oneoffs";
pub const STATUS_QUEUE_KEY: &str = "pending_status_ops";
pub const ONEOFF_QUEUE_KEY: &str = "pending_oneoff_ops";

/// State recovered from a store at startup.
#[derive(Debug, Default)]
pub(crate) struct Restored {
    pub cache: CacheSnapshot,
    pub status_queue: StatusQueue,
    pub oneoff_queue: OneOffQueue,
}

fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.load_json::<T>(key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, "Ignoring unreadable persisted value: {}", e);
            T::default()
        }
    }
}

pub(crate) fn restore(store: &dyn KeyValueStore) -> Restored {
    let categories: Vec<Category> = load_or_default(store, CATEGORIES_KEY);
    let recommended: Vec<TodoWithCategory> = load_or_default(store, RECOMMENDED_KEY);
    let oneoffs: Vec<OneOffTodo> = load_or_default(store, ONEOFFS_KEY);
    let status_ops: Vec<StatusOp> = load_or_default(store, STATUS_QUEUE_KEY);
    let oneoff_ops: Vec<OneOffOp> = load_or_default(store, ONEOFF_QUEUE_KEY);

    tracing::debug!(
        status_ops = status_ops.len(),
        oneoff_ops = oneoff_ops.len(),
        "Restored persisted sync state"
    );

    Restored {
        cache: CacheSnapshot::new(categories, recommended, oneoffs),
        status_queue: StatusQueue::from_ops(status_ops),
        oneoff_queue: OneOffQueue::from_ops(oneoff_ops),
    }
}

fn save<T: serde::Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    if let Err(e) = store.save_json(key, value) {
        tracing::warn!(key, "Failed to persist: {}", e);
    }
}

pub(crate) fn save_queues(store: &dyn KeyValueStore, statuses: &StatusQueue, oneoffs: &OneOffQueue) {
    save(store, STATUS_QUEUE_KEY, statuses.ops());
    save(store, ONEOFF_QUEUE_KEY, oneoffs.ops());
}

pub(crate) fn save_cache(store: &dyn KeyValueStore, cache: &CacheSnapshot) {
    save(store, CATEGORIES_KEY, &cache.categories);
    save(store, RECOMMENDED_KEY, &cache.recommended);
    save(store, ONEOFFS_KEY, &cache.oneoffs);
}
