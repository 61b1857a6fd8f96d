//! Request metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `daedalus_requests_total` | Counter | `route`, `status` |
//! | `daedalus_request_duration_seconds` | Histogram | `route` |
//! | `daedalus_fallback_renders_total` | Counter | `status` |
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so the dispatch shells record unconditionally.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Total rendered requests.
pub const REQUESTS_TOTAL: &str = "daedalus_requests_total";

/// Render latency.
pub const REQUEST_DURATION_SECONDS: &str = "daedalus_request_duration_seconds";

/// Error page renders.
pub const FALLBACK_RENDERS_TOTAL: &str = "daedalus_fallback_renders_total";

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether a recorder is installed.
    pub enabled: bool,
    /// Histogram buckets for render latency, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Handle onto the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Renders every metric in Prometheus exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the Prometheus recorder.
///
/// Returns `Ok(None)` when metrics are disabled. Exposing the rendered text
/// over HTTP is left to the caller.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    if !config.enabled {
        return Ok(None);
    }
    if HANDLE.get().is_some() {
        return Err(TelemetryError::AlreadyInitialized("metrics"));
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe();
    let handle = HANDLE.get_or_init(|| handle).clone();
    Ok(Some(MetricsRegistry { handle }))
}

/// Returns the installed registry, if any.
#[must_use]
pub fn registry() -> Option<MetricsRegistry> {
    HANDLE.get().map(|handle| MetricsRegistry {
        handle: handle.clone(),
    })
}

fn describe() {
    describe_counter!(REQUESTS_TOTAL, "Requests rendered by the dispatch shell");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Time spent rendering a request");
    describe_counter!(FALLBACK_RENDERS_TOTAL, "Error page renders by status");
}

/// Records a completed request.
pub fn record_request(route: &str, status: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "route" => route.to_string())
        .record(duration.as_secs_f64());
}

/// Records an error page render.
pub fn record_fallback_render(status: u16) {
    counter!(FALLBACK_RENDERS_TOTAL, "status" => status.to_string()).increment(1);
}
