//! The freshness cache: namespaced, timestamped entries over a [`KvStore`].
//!
//! Storage faults never escape this type. Reads of missing, unreadable or
//! corrupt entries return `None`; writes are best effort.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::util::millis;

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::entry::{CacheEntry, Freshness, StoredEntry, StoredEntryRef};
use super::error::CacheConfigError;
use super::inflight::InFlight;
use super::keys::storage_key;
use super::store::{KvStore, StoreError};

pub(crate) const METRIC_CACHE_HIT: &str = "freshstack_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "freshstack_cache_miss_total";
pub(crate) const METRIC_CACHE_QUOTA_SWEEP: &str = "freshstack_cache_quota_sweep_total";

/// Stale-while-revalidate cache handle. Clones share the same store and
/// in-flight map.
pub struct FreshnessCache<S: KvStore> {
    pub(crate) inner: Arc<Inner<S>>,
}

pub(crate) struct Inner<S: KvStore> {
    pub(crate) store: S,
    pub(crate) config: CacheConfig,
    pub(crate) prefix: String,
    pub(crate) freshness: Freshness,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) inflight: InFlight,
}

impl<S: KvStore> Clone for FreshnessCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KvStore> FreshnessCache<S> {
    /// Create a cache over `store` using the system clock.
    pub fn new(store: S, config: CacheConfig) -> Result<Self, CacheConfigError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: S,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheConfigError> {
        config.validate()?;
        let prefix = config.key_prefix();
        let freshness = Freshness::new(config.fresh_ttl(), config.stale_ttl());
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                config,
                prefix,
                freshness,
                clock,
                inflight: InFlight::new(),
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Number of keys with a fetch currently in flight.
    pub fn in_flight_len(&self) -> usize {
        self.inner.inflight.len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.inflight.contains(key)
    }

    fn now_ms(&self) -> i64 {
        millis::to_unix_millis(self.inner.clock.now())
    }

    /// Read an entry and classify it against the current time.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let storage_key = storage_key(&self.inner.prefix, key);
        let raw = match self.inner.store.get_item(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
            Err(error) => {
                warn!(key, error = %error, op = "get", "Cache read failed");
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
        };

        let entry = serde_json::from_str::<StoredEntry>(&raw)
            .map_err(|error| error.to_string())
            .and_then(|stored| {
                self.inner
                    .freshness
                    .entry(key, stored, self.now_ms())
                    .ok_or_else(|| "timestamp out of range".to_string())
            });

        match entry {
            Ok(entry) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(entry)
            }
            Err(reason) => {
                warn!(key, reason, op = "get", "Ignoring corrupt cache entry");
                counter!(METRIC_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Overwrite `key` with `value`, stamped with the current time.
    ///
    /// A quota failure triggers one sweep of stale entries and one retry; if
    /// that also fails the write is dropped.
    pub fn set(&self, key: &str, value: &Value) {
        let stored = StoredEntryRef {
            value,
            timestamp: self.now_ms(),
        };
        let encoded = match serde_json::to_string(&stored) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(key, error = %error, op = "set", "Cache entry could not be encoded");
                return;
            }
        };

        let storage_key = storage_key(&self.inner.prefix, key);
        match self.inner.store.set_item(&storage_key, &encoded) {
            Ok(()) => {}
            Err(error) if error.is_quota() => {
                counter!(METRIC_CACHE_QUOTA_SWEEP).increment(1);
                let removed = self.sweep();
                debug!(key, removed, "Retrying cache write after quota sweep");
                if let Err(retry_error) = self.inner.store.set_item(&storage_key, &encoded) {
                    warn!(
                        key,
                        error = %retry_error,
                        op = "set",
                        result = "dropped",
                        "Cache write failed after cleanup"
                    );
                }
            }
            Err(error) => {
                warn!(key, error = %error, op = "set", result = "dropped", "Cache write failed");
            }
        }
    }

    pub fn remove(&self, key: &str) {
        let storage_key = storage_key(&self.inner.prefix, key);
        if let Err(error) = self.inner.store.remove_item(&storage_key) {
            warn!(key, error = %error, op = "remove", "Cache remove failed");
        }
    }

    /// Remove every entry in this cache's namespace. Foreign keys sharing the
    /// store are left alone.
    pub fn clear(&self) {
        let keys = match self.own_keys() {
            Ok(keys) => keys,
            Err(error) => {
                warn!(error = %error, op = "clear", "Cache clear failed");
                return;
            }
        };
        for storage_key in keys {
            if let Err(error) = self.inner.store.remove_item(&storage_key) {
                warn!(storage_key, error = %error, op = "clear", "Cache remove failed");
            }
        }
    }

    /// Prune entries older than the stale window, plus any that no longer
    /// parse. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let keys = match self.own_keys() {
            Ok(keys) => keys,
            Err(error) => {
                warn!(error = %error, op = "sweep", "Cache sweep failed");
                return 0;
            }
        };

        let now_ms = self.now_ms();
        let mut removed = 0;
        for storage_key in keys {
            let prune = match self.inner.store.get_item(&storage_key) {
                Ok(Some(raw)) => match serde_json::from_str::<StoredEntry>(&raw) {
                    Ok(stored) => self.inner.freshness.is_stale(stored.timestamp, now_ms),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(error) => {
                    warn!(storage_key, error = %error, op = "sweep", "Cache read failed");
                    false
                }
            };

            if !prune {
                continue;
            }
            match self.inner.store.remove_item(&storage_key) {
                Ok(()) => removed += 1,
                Err(error) => {
                    warn!(storage_key, error = %error, op = "sweep", "Cache remove failed");
                }
            }
        }

        info!(removed, "Cleared old cache entries");
        removed
    }

    /// Keys currently stored in this cache's namespace, without the prefix.
    pub fn keys(&self) -> Vec<String> {
        match self.own_keys() {
            Ok(keys) => {
                let prefix = self.inner.prefix.len();
                let mut keys: Vec<String> = keys
                    .into_iter()
                    .map(|key| key[prefix..].to_string())
                    .collect();
                keys.sort();
                keys
            }
            Err(error) => {
                warn!(error = %error, op = "keys", "Cache key listing failed");
                Vec::new()
            }
        }
    }

    fn own_keys(&self) -> Result<Vec<String>, StoreError> {
        let prefix = self.inner.prefix.as_str();
        Ok(self
            .inner
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}
