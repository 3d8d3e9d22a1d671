//! Stale-while-revalidate orchestration.
//!
//! `fetch_with_cache` hands cached data to the caller before any network work
//! begins, then refreshes in the background and only reports the fresh result
//! when it differs from what the caller already has.

use std::future::Future;

use futures::FutureExt;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use super::entry::{CacheEntry, DataMeta};
use super::error::FetchError;
use super::freshness::FreshnessCache;
use super::inflight::{FetchOutcome, InFlightGuard, SharedFetch};
use super::store::KvStore;

pub(crate) const METRIC_CACHE_DEDUP: &str = "freshstack_cache_dedup_total";
pub(crate) const METRIC_FETCH_ERROR: &str = "freshstack_fetch_error_total";

impl<S: KvStore> FreshnessCache<S> {
    /// Serve `key` from cache and refresh it through `fetch`.
    ///
    /// Any cached entry is passed to `on_data` before this function returns,
    /// whatever its age. If a fetch for `key` is already running its shared
    /// future is returned and `fetch` is never called. Otherwise `fetch` is
    /// spawned onto the current tokio runtime; it keeps running even if the
    /// returned future is dropped.
    ///
    /// The returned future resolves to the fetch outcome. It resolves to `Err`
    /// on failure even when cached or fallback data reached `on_data`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn fetch_with_cache<F, Fut, D, E>(
        &self,
        key: &str,
        fetch: F,
        mut on_data: D,
        on_error: E,
    ) -> SharedFetch
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
        D: FnMut(&Value, DataMeta) + Send + 'static,
        E: FnOnce(&FetchError) + Send + 'static,
    {
        let cached = self.get(key);
        if let Some(entry) = &cached {
            on_data(&entry.value, DataMeta::cached(entry));
        }

        let cache = self.clone();
        let owned_key = key.to_string();
        let (future, joined) = self.inner.inflight.join_or_start(key, move |guard| {
            let task = tokio::spawn(async move {
                let outcome = fetch().await;
                cache.settle(&owned_key, outcome, cached, guard, on_data, on_error)
            });
            async move {
                task.await
                    .unwrap_or_else(|error| Err(FetchError::aborted(error.to_string())))
            }
            .boxed()
            .shared()
        });

        if joined {
            counter!(METRIC_CACHE_DEDUP).increment(1);
            debug!(key, "Joined in-flight fetch");
        }
        future
    }

    /// Refresh `key` without a consumer, e.g. during idle time.
    pub fn warm<F, Fut>(&self, key: &str, fetch: F) -> SharedFetch
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let log_key = key.to_string();
        self.fetch_with_cache(
            key,
            fetch,
            |_, _| {},
            move |error| debug!(key = %log_key, error = %error, "Cache warm failed"),
        )
    }

    fn settle<D, E>(
        &self,
        key: &str,
        outcome: FetchOutcome,
        cached: Option<CacheEntry>,
        guard: InFlightGuard,
        mut on_data: D,
        on_error: E,
    ) -> FetchOutcome
    where
        D: FnMut(&Value, DataMeta),
        E: FnOnce(&FetchError),
    {
        match outcome {
            Ok(value) => {
                self.set(key, &value);
                let changed = cached.as_ref().is_none_or(|entry| entry.value != value);
                if changed {
                    on_data(&value, DataMeta::network());
                } else {
                    debug!(key, "Fresh data matches cache");
                }
                drop(guard);
                Ok(value)
            }
            Err(error) => {
                drop(guard);
                counter!(METRIC_FETCH_ERROR).increment(1);

                if cached.is_some() {
                    if error.is_rate_limited() {
                        warn!(key, "Rate limited on background refresh, using cached data");
                    } else {
                        warn!(key, error = %error, "Background fetch failed, using cached data");
                    }
                    return Err(error);
                }

                let fallback = if error.is_rate_limited() {
                    self.get(key).filter(|entry| entry.is_stale)
                } else {
                    None
                };
                match fallback {
                    Some(entry) => {
                        warn!(key, "Rate limited, serving stale cached data");
                        on_data(&entry.value, DataMeta::rate_limited_fallback());
                    }
                    None => on_error(&error),
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::super::config::CacheConfig;
    use super::super::store::MemoryStore;
    use super::*;

    type Deliveries = Arc<Mutex<Vec<(Value, DataMeta)>>>;

    fn recorder() -> (Deliveries, impl FnMut(&Value, DataMeta) + Send + 'static) {
        let seen: Deliveries = Arc::default();
        let sink = Arc::clone(&seen);
        (seen, move |value: &Value, meta| {
            sink.lock().expect("lock").push((value.clone(), meta));
        })
    }

    fn cache() -> FreshnessCache<MemoryStore> {
        FreshnessCache::new(MemoryStore::new(), CacheConfig::default()).expect("valid config")
    }

    #[tokio::test]
    async fn miss_delivers_network_result_once() {
        let cache = cache();
        let (seen, on_data) = recorder();

        let value = cache
            .fetch_with_cache("k", || async { Ok(json!([1, 2])) }, on_data, |_| {
                panic!("no error expected")
            })
            .await
            .expect("fetch succeeds");

        assert_eq!(value, json!([1, 2]));
        assert_eq!(*seen.lock().expect("lock"), vec![(json!([1, 2]), DataMeta::network())]);
        assert_eq!(cache.get("k").expect("stored").value, json!([1, 2]));
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn warm_populates_the_cache() {
        let cache = cache();

        cache
            .warm("dashboard", || async { Ok(json!({"lbs": 1})) })
            .await
            .expect("warm succeeds");

        assert_eq!(cache.get("dashboard").expect("warmed").value, json!({"lbs": 1}));
    }

    #[tokio::test]
    async fn failure_without_cache_reaches_on_error() {
        let cache = cache();
        let errors = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&errors);

        let result = cache
            .fetch_with_cache(
                "k",
                || async { Err(FetchError::from_status(500, None)) },
                |_, _| panic!("no data expected"),
                move |_| {
                    counted.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert_eq!(result, Err(FetchError::Status { status: 500 }));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(!cache.is_in_flight("k"));
    }
}
