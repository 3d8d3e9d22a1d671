//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CacheConfig;
use crate::notify::{FeedConfig, PopupConfig};

pub use cli::{CliArgs, Command, FetchArgs, InspectArgs, Overrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "freshstack";
const ENV_PREFIX: &str = "FRESHSTACK";
const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STORE_DIR: &str = ".freshstack/cache";
// Roughly what browsers grant a single origin's local storage.
const DEFAULT_STORE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheConfig,
    pub popups: PopupConfig,
    pub api: ApiSettings,
    pub feed: FeedConfig,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Required by the commands that touch the network.
    pub base_url: Option<Url>,
    pub timeout: Duration,
    /// Path, relative to `base_url`, that takes the `action` parameter.
    pub action_path: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub directory: PathBuf,
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: CacheConfig,
    popups: PopupConfig,
    api: RawApiSettings,
    feed: FeedConfig,
    store: RawStoreSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.api_timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(directory) = overrides.store_directory.as_ref() {
            self.store.directory = Some(directory.clone());
        }
        if let Some(quota) = overrides.store_quota_bytes {
            self.store.quota_bytes = Some(quota);
        }
        if let Some(seconds) = overrides.cache_fresh_ttl_seconds {
            self.cache.fresh_ttl_secs = seconds;
        }
        if let Some(seconds) = overrides.cache_stale_ttl_seconds {
            self.cache.stale_ttl_secs = seconds;
        }
        if let Some(count) = overrides.popups_max_visible {
            self.popups.max_visible = count;
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            popups,
            api,
            feed,
            store,
        } = raw;

        cache
            .validate()
            .map_err(|err| LoadError::invalid("cache", err.to_string()))?;
        popups
            .validate()
            .map_err(|err| LoadError::invalid("popups", err.to_string()))?;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache,
            popups,
            api: build_api_settings(api)?,
            feed: build_feed_settings(feed)?,
            store: build_store_settings(store)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = api
        .base_url
        .and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .map(|value| {
            Url::parse(&value)
                .map_err(|err| LoadError::invalid("api.base_url", format!("invalid URL: {err}")))
        })
        .transpose()?;

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        action_path: api.action_path.unwrap_or_default(),
    })
}

fn build_feed_settings(feed: FeedConfig) -> Result<FeedConfig, LoadError> {
    if feed.poll_interval_secs == 0 {
        return Err(LoadError::invalid(
            "feed.poll_interval_secs",
            "must be greater than zero",
        ));
    }
    if feed.limit == 0 {
        return Err(LoadError::invalid("feed.limit", "must be greater than zero"));
    }
    Ok(feed)
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let directory = store
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "store.directory",
            "path must not be empty",
        ));
    }

    // Zero disables the limit.
    let quota_bytes = match store.quota_bytes {
        Some(0) => None,
        Some(bytes) => Some(bytes),
        None => Some(DEFAULT_STORE_QUOTA_BYTES),
    };

    Ok(StoreSettings {
        directory,
        quota_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    action_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    directory: Option<PathBuf>,
    quota_bytes: Option<u64>,
}

#[cfg(test)]
mod tests;
