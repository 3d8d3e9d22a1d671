//! Cached access to the dashboard API.

use std::sync::Arc;

use serde_json::Value;
use time::{Date, Duration};
use tracing::debug;

use crate::cache::{DataMeta, FreshnessCache, KvStore, SharedFetch, generate_key};

use super::{ApiRequest, FetchError, Transport, decode_data_envelope};

const ACTION_PARAM: &str = "action";
const DASHBOARD_ACTION: &str = "dashboard";
const WEEK: Duration = Duration::days(7);

/// Routes `?action=` style API calls through the freshness cache.
pub struct ApiClient<S: KvStore, T: Transport> {
    cache: FreshnessCache<S>,
    transport: Arc<T>,
    endpoint: String,
}

impl<S: KvStore, T: Transport> Clone for ApiClient<S, T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            transport: Arc::clone(&self.transport),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<S: KvStore, T: Transport> ApiClient<S, T> {
    /// `endpoint` is the path, relative to the transport base, that accepts
    /// the `action` query parameter. An empty path targets the base itself.
    pub fn new(cache: FreshnessCache<S>, transport: Arc<T>, endpoint: impl Into<String>) -> Self {
        Self {
            cache,
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn cache(&self) -> &FreshnessCache<S> {
        &self.cache
    }

    /// Fetch `action` with `params` through the cache.
    pub fn fetch_action<D, E>(
        &self,
        action: &str,
        params: &[(&str, String)],
        on_data: D,
        on_error: E,
    ) -> SharedFetch
    where
        D: FnMut(&Value, DataMeta) + Send + 'static,
        E: FnOnce(&FetchError) + Send + 'static,
    {
        let key = generate_key(action, params.iter().map(|(name, value)| (*name, value)));
        let request = self.action_request(action, params);
        let transport = Arc::clone(&self.transport);
        let fetch = move || async move {
            let body = transport.fetch(request).await?;
            decode_data_envelope(body)
        };
        self.cache.fetch_with_cache(&key, fetch, on_data, on_error)
    }

    /// Dashboard totals for the inclusive range `start..=end`.
    pub fn dashboard<D, E>(&self, start: Date, end: Date, on_data: D, on_error: E) -> SharedFetch
    where
        D: FnMut(&Value, DataMeta) + Send + 'static,
        E: FnOnce(&FetchError) + Send + 'static,
    {
        self.fetch_action(
            DASHBOARD_ACTION,
            &[("start", start.to_string()), ("end", end.to_string())],
            on_data,
            on_error,
        )
    }

    /// Warm the ranges most dashboards open with: today, and the week
    /// ending today.
    pub fn prefetch_common_ranges(&self, today: Date) -> Vec<SharedFetch> {
        let week_ago = today.checked_sub(WEEK).unwrap_or(today);
        [(today, today), (week_ago, today)]
            .into_iter()
            .map(|(start, end)| {
                debug!(%start, %end, "Prefetching dashboard range");
                self.dashboard(start, end, |_, _| {}, |_| {})
            })
            .collect()
    }

    fn action_request(&self, action: &str, params: &[(&str, String)]) -> ApiRequest {
        params.iter().fold(
            ApiRequest::get(self.endpoint.clone()).with_query(ACTION_PARAM, action),
            |request, (name, value)| request.with_query(*name, value.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use time::macros::date;

    use crate::cache::{CacheConfig, MemoryStore};

    use super::*;

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn fetch(&self, request: ApiRequest) -> Result<Value, FetchError> {
            self.requests.lock().expect("lock").push(request);
            Ok(json!({"success": true, "data": {"lbs": 7}}))
        }
    }

    fn client() -> (ApiClient<MemoryStore, Recording>, Arc<Recording>) {
        let cache = FreshnessCache::new(MemoryStore::new(), CacheConfig::default())
            .expect("valid config");
        let transport = Arc::new(Recording::default());
        (ApiClient::new(cache, Arc::clone(&transport), ""), transport)
    }

    #[tokio::test]
    async fn dashboard_sends_action_and_range() {
        let (client, transport) = client();

        let value = client
            .dashboard(date!(2025 - 06 - 01), date!(2025 - 06 - 07), |_, _| {}, |_| {})
            .await
            .expect("fetch succeeds");

        assert_eq!(value, json!({"lbs": 7}));
        let requests = transport.requests.lock().expect("lock");
        assert_eq!(
            requests[0],
            ApiRequest::get("")
                .with_query("action", "dashboard")
                .with_query("start", "2025-06-01")
                .with_query("end", "2025-06-07")
        );
        assert!(
            client
                .cache()
                .get("dashboard?end=2025-06-07&start=2025-06-01")
                .is_some()
        );
    }

    #[tokio::test]
    async fn prefetch_warms_today_and_last_week() {
        let (client, _transport) = client();

        for fetch in client.prefetch_common_ranges(date!(2025 - 06 - 10)) {
            fetch.await.expect("prefetch succeeds");
        }

        let cache = client.cache();
        assert!(cache.get("dashboard?end=2025-06-10&start=2025-06-10").is_some());
        assert!(cache.get("dashboard?end=2025-06-10&start=2025-06-03").is_some());
    }
}
