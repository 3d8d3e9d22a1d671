//! Cache entries and their freshness classification.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::util::millis;

/// A cached payload as read back from the store.
///
/// `is_fresh` and `is_stale` are computed against the clock at read time and
/// are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub stored_at: OffsetDateTime,
    pub is_fresh: bool,
    pub is_stale: bool,
}

/// How a payload handed to `on_data` was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataMeta {
    pub from_cache: bool,
    pub is_fresh: bool,
    pub is_stale: bool,
    pub rate_limited: bool,
}

impl DataMeta {
    pub fn cached(entry: &CacheEntry) -> Self {
        Self {
            from_cache: true,
            is_fresh: entry.is_fresh,
            is_stale: entry.is_stale,
            rate_limited: false,
        }
    }

    pub fn network() -> Self {
        Self {
            from_cache: false,
            is_fresh: true,
            is_stale: false,
            rate_limited: false,
        }
    }

    /// Last-resort delivery of a stale entry after the upstream refused us.
    pub fn rate_limited_fallback() -> Self {
        Self {
            from_cache: true,
            is_fresh: false,
            is_stale: true,
            rate_limited: true,
        }
    }
}

/// Persisted form: `{"value": ..., "timestamp": <unix ms>}`.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredEntry {
    pub value: Value,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct StoredEntryRef<'a> {
    pub value: &'a Value,
    pub timestamp: i64,
}

/// Freshness windows in milliseconds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Freshness {
    fresh_ms: i64,
    stale_ms: i64,
}

impl Freshness {
    pub fn new(fresh_ttl: Duration, stale_ttl: Duration) -> Self {
        Self {
            fresh_ms: millis::duration_millis(fresh_ttl),
            stale_ms: millis::duration_millis(stale_ttl),
        }
    }

    /// `(is_fresh, is_stale)` for an entry written at `stored_ms`.
    pub fn classify(&self, stored_ms: i64, now_ms: i64) -> (bool, bool) {
        let age = now_ms.saturating_sub(stored_ms);
        (age < self.fresh_ms, age > self.stale_ms)
    }

    pub fn is_stale(&self, stored_ms: i64, now_ms: i64) -> bool {
        self.classify(stored_ms, now_ms).1
    }

    /// Materialize a stored entry; `None` when its timestamp is unrepresentable.
    pub fn entry(&self, key: &str, stored: StoredEntry, now_ms: i64) -> Option<CacheEntry> {
        let stored_at = millis::from_unix_millis(stored.timestamp)?;
        let (is_fresh, is_stale) = self.classify(stored.timestamp, now_ms);
        Some(CacheEntry {
            key: key.to_string(),
            value: stored.value,
            stored_at,
            is_fresh,
            is_stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRESH: i64 = 5 * 60 * 1000;
    const STALE: i64 = 24 * 60 * 60 * 1000;

    fn windows() -> Freshness {
        Freshness::new(Duration::from_secs(300), Duration::from_secs(86_400))
    }

    #[test]
    fn freshness_boundaries() {
        let written = 1_700_000_000_000;
        let freshness = windows();

        assert!(freshness.classify(written, written + FRESH - 1).0);
        assert!(!freshness.classify(written, written + FRESH + 1).0);
        assert!(!freshness.classify(written, written + STALE - 1).1);
        assert!(freshness.classify(written, written + STALE + 1).1);
    }

    #[test]
    fn entry_between_windows_is_neither_fresh_nor_stale() {
        let (is_fresh, is_stale) = windows().classify(0, FRESH + 10_000);
        assert!(!is_fresh);
        assert!(!is_stale);
    }

    #[test]
    fn stored_form_uses_value_and_timestamp_fields() {
        let value = serde_json::json!({"lbs": 100});
        let encoded = serde_json::to_value(StoredEntryRef {
            value: &value,
            timestamp: 42,
        })
        .expect("serialize");

        assert_eq!(encoded, serde_json::json!({"value": {"lbs": 100}, "timestamp": 42}));
    }
}
