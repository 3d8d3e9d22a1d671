//! Stale-while-revalidate request cache.
//!
//! Entries live in a [`KvStore`] under a versioned prefix such as
//! `ro-api-cache-v1.2-`, so an upgraded cache format can share a store with
//! older entries until they are swept.
//!
//! ## Configuration
//!
//! Freshness windows are controlled via `freshstack.toml`:
//!
//! ```toml
//! [cache]
//! fresh_ttl_secs = 300
//! stale_ttl_secs = 86400
//! namespace = "ro-api-cache"
//! format_version = "1.2"
//! ```

mod clock;
mod config;
mod entry;
mod error;
mod fetch;
mod freshness;
mod inflight;
mod keys;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use entry::{CacheEntry, DataMeta};
pub use error::{CacheConfigError, FetchError};
pub use freshness::FreshnessCache;
pub use inflight::{FetchOutcome, SharedFetch};
pub use keys::generate_key;
pub use store::{KvStore, MemoryStore, StoreError};

pub(crate) use fetch::{METRIC_CACHE_DEDUP, METRIC_FETCH_ERROR};
pub(crate) use freshness::{METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_QUOTA_SWEEP};
