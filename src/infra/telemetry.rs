use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::render::{
        METRIC_CACHE_EXPIRED_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL,
        METRIC_CACHE_NOT_MODIFIED_TOTAL, METRIC_RENDER_MS, METRIC_TEMPLATE_RELOAD_TOTAL,
    },
    cache::METRIC_CACHE_EVICT_TOTAL,
    config::{LogFormat, LoggingSettings},
    infra::minify::METRIC_MINIFY_FALLBACK_TOTAL,
};

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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

/// Register descriptions for every metric the renderer emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of fresh response-cache hits."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of response-cache misses."
        );
        describe_counter!(
            METRIC_CACHE_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of cached responses found past their ttl and evicted."
        );
        describe_counter!(
            METRIC_CACHE_EVICT_TOTAL,
            Unit::Count,
            "Total number of response-cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_CACHE_NOT_MODIFIED_TOTAL,
            Unit::Count,
            "Total number of 304 responses served from the cache."
        );
        describe_counter!(
            METRIC_TEMPLATE_RELOAD_TOTAL,
            Unit::Count,
            "Total number of template reloads, labelled by result."
        );
        describe_counter!(
            METRIC_MINIFY_FALLBACK_TOTAL,
            Unit::Count,
            "Total number of responses served unminified after an engine failure."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "Render call latency in milliseconds, including cache hits."
        );
    });
}
