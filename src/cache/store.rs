//! Durable key-value storage behind the freshness cache.
//!
//! The cache only needs string-in, string-out storage with key enumeration,
//! which is exactly what browser `localStorage` offers. [`MemoryStore`] keeps
//! the same contract in process, including an optional byte quota so the
//! quota-recovery path can be exercised without a real browser.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::util::lock;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// String key-value storage shared by everything on one host.
///
/// Implementations must tolerate foreign keys: the cache only ever touches
/// keys carrying its own prefix.
pub trait KvStore: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<T: KvStore> KvStore for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}

/// In-process store with an optional quota on `key + value` bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently accounted against the quota.
    pub fn used_bytes(&self) -> u64 {
        lock::read(&self.items, SOURCE, "used_bytes")
            .iter()
            .map(|(key, value)| item_bytes(key, value))
            .sum()
    }

    pub fn len(&self) -> usize {
        lock::read(&self.items, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn item_bytes(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

impl KvStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock::read(&self.items, SOURCE, "get_item").get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = lock::write(&self.items, SOURCE, "set_item");

        if let Some(quota) = self.quota_bytes {
            let used: u64 = items.iter().map(|(k, v)| item_bytes(k, v)).sum();
            let replaced = items.get(key).map_or(0, |old| item_bytes(key, old));
            let needed = item_bytes(key, value);
            let available = quota.saturating_sub(used - replaced);
            if needed > available {
                return Err(StoreError::QuotaExceeded { needed, available });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        lock::write(&self.items, SOURCE, "remove_item").remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(lock::read(&self.items, SOURCE, "keys")
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();

        assert!(store.get_item("a").expect("get").is_none());
        store.set_item("a", "1").expect("set");
        assert_eq!(store.get_item("a").expect("get").as_deref(), Some("1"));

        store.remove_item("a").expect("remove");
        assert!(store.get_item("a").expect("get").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn quota_counts_keys_and_values() {
        let store = MemoryStore::with_quota(10);

        store.set_item("ab", "cdef").expect("6 bytes fit");
        let err = store.set_item("gh", "ijkl").expect_err("12 bytes do not fit");
        assert!(err.is_quota());
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn overwriting_releases_the_old_value() {
        let store = MemoryStore::with_quota(10);

        store.set_item("k", "123456789").expect("10 bytes fit exactly");
        store
            .set_item("k", "987654321")
            .expect("replacement reuses the same budget");
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn removing_missing_key_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.remove_item("missing").is_ok());
    }
}
