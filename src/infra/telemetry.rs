//! Tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_BYPASS_TOTAL, METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_NON_CACHEABLE_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

const CACHE_COUNTERS: [(&str, &str); 5] = [
    (
        METRIC_CACHE_HIT_TOTAL,
        "Responses served from the static-assets or pages store.",
    ),
    (
        METRIC_CACHE_MISS_TOTAL,
        "Eligible requests that ran the handler because nothing was stored.",
    ),
    (
        METRIC_CACHE_EVICT_TOTAL,
        "Least recently used entries dropped to stay within capacity.",
    ),
    (
        METRIC_CACHE_BYPASS_TOTAL,
        "Requests that skipped the cache, labelled by reason.",
    ),
    (
        METRIC_CACHE_NON_CACHEABLE_TOTAL,
        "Static paths remembered as too large to cache.",
    ),
];

static DESCRIBE: Once = Once::new();

/// Install the global subscriber. Fails if one is already set.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    DESCRIBE.call_once(describe_metrics);

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(output_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::Telemetry(format!("failed to install tracing subscriber: {err}")))
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    }
}

fn describe_metrics() {
    for (name, description) in CACHE_COUNTERS {
        describe_counter!(name, Unit::Count, description);
    }
}
