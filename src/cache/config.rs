//! Cache configuration.
//!
//! Controls freshness windows and the storage namespace via `freshstack.toml`.

use std::time::Duration;

use serde::Deserialize;

use super::error::CacheConfigError;

// Default values for cache configuration
const DEFAULT_FRESH_TTL_SECS: u64 = 5 * 60;
const DEFAULT_STALE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_NAMESPACE: &str = "ro-api-cache";
const DEFAULT_FORMAT_VERSION: &str = "1.2";

/// Cache configuration from the `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries younger than this are fresh.
    pub fresh_ttl_secs: u64,
    /// Entries older than this are stale and only served as a last resort.
    pub stale_ttl_secs: u64,
    /// Application namespace shared by every key this cache writes.
    pub namespace: String,
    /// Stored-entry format version; bumping it orphans old entries until swept.
    pub format_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_secs: DEFAULT_FRESH_TTL_SECS,
            stale_ttl_secs: DEFAULT_STALE_TTL_SECS,
            namespace: DEFAULT_NAMESPACE.to_string(),
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn fresh_ttl(&self) -> Duration {
        Duration::from_secs(self.fresh_ttl_secs)
    }

    pub fn stale_ttl(&self) -> Duration {
        Duration::from_secs(self.stale_ttl_secs)
    }

    /// Versioned prefix carried by every storage key, e.g. `ro-api-cache-v1.2-`.
    pub fn key_prefix(&self) -> String {
        format!("{}-v{}-", self.namespace, self.format_version)
    }

    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(CacheConfigError::EmptyNamespace);
        }
        if self.fresh_ttl_secs == 0 {
            return Err(CacheConfigError::ZeroFreshTtl);
        }
        if self.fresh_ttl_secs > self.stale_ttl_secs {
            return Err(CacheConfigError::TtlOrder {
                fresh: self.fresh_ttl(),
                stale: self.stale_ttl(),
            });
        }
        Ok(())
    }
}
