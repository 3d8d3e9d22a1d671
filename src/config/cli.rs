use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the freshstack binary.
#[derive(Debug, Parser)]
#[command(
    name = "freshstack",
    version,
    about = "Inspect and drive the dashboard request cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FRESHSTACK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch an API action through the cache and print every delivery.
    Fetch(FetchArgs),
    /// Warm the cache with today's and this week's dashboard ranges.
    Prefetch,
    /// List cached entries with their freshness.
    Inspect(InspectArgs),
    /// Remove stale and unreadable entries.
    Sweep,
    /// Remove every entry in the cache namespace.
    Clear,
    /// Poll for notifications and print popups to the terminal.
    Watch,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// API action, e.g. `dashboard`.
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Query parameter as NAME=VALUE; may be repeated.
    #[arg(long = "param", short = 'p', value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct InspectArgs {
    /// Show a single key instead of the whole namespace.
    #[arg(value_name = "KEY")]
    pub key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the API base URL.
    #[arg(long = "api-base-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub api_base_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS")]
    pub api_timeout_seconds: Option<u64>,

    /// Override the cache directory.
    #[arg(long = "store-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub store_directory: Option<PathBuf>,

    /// Override the cache size limit in bytes.
    #[arg(long = "store-quota-bytes", value_name = "BYTES")]
    pub store_quota_bytes: Option<u64>,

    /// Override how long entries count as fresh.
    #[arg(long = "cache-fresh-ttl-seconds", value_name = "SECONDS")]
    pub cache_fresh_ttl_seconds: Option<u64>,

    /// Override how old an entry must be to count as stale.
    #[arg(long = "cache-stale-ttl-seconds", value_name = "SECONDS")]
    pub cache_stale_ttl_seconds: Option<u64>,

    /// Override the number of popups visible at once.
    #[arg(long = "popups-max-visible", value_name = "COUNT")]
    pub popups_max_visible: Option<usize>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}
