use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_DEDUP, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_QUOTA_SWEEP,
    METRIC_FETCH_ERROR,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::notify::{METRIC_POPUP_EVICT, METRIC_POPUP_VISIBLE};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of cache reads that found a usable entry."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of cache reads that found nothing usable."
        );
        describe_counter!(
            METRIC_CACHE_DEDUP,
            Unit::Count,
            "Total number of fetches that joined an in-flight request."
        );
        describe_counter!(
            METRIC_CACHE_QUOTA_SWEEP,
            Unit::Count,
            "Total number of sweeps triggered by a storage quota error."
        );
        describe_counter!(
            METRIC_FETCH_ERROR,
            Unit::Count,
            "Total number of failed background fetches."
        );
        describe_counter!(
            METRIC_POPUP_EVICT,
            Unit::Count,
            "Total number of popups evicted to make room for newer ones."
        );
        describe_gauge!(
            METRIC_POPUP_VISIBLE,
            Unit::Count,
            "Current number of popups on screen."
        );
    });
}
