use std::time::Duration;

use thiserror::Error;

/// Failure of a caller-supplied fetch.
///
/// `Clone` because a single in-flight fetch hands the same outcome to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },
    #[error("upstream reported failure: {message}")]
    Upstream { message: String },
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("response could not be decoded: {message}")]
    Decode { message: String },
    #[error("fetch task aborted: {message}")]
    Aborted { message: String },
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, retry_after_secs: Option<u64>) -> Self {
        if status == 429 {
            Self::RateLimited { retry_after_secs }
        } else {
            Self::Status { status }
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Status { status: 429 }
        )
    }
}

/// Rejected cache construction parameters.
#[derive(Debug, Error)]
pub enum CacheConfigError {
    #[error("fresh ttl must be greater than zero")]
    ZeroFreshTtl,
    #[error("fresh ttl ({fresh:?}) must not exceed stale ttl ({stale:?})")]
    TtlOrder { fresh: Duration, stale: Duration },
    #[error("cache namespace must not be empty")]
    EmptyNamespace,
}
