//! Logging and metrics for Daedalus.
//!
//! - **Logging**: [`init_logging`] installs a `tracing-subscriber` registry
//!   with an `EnvFilter` and a JSON or pretty formatter.
//! - **Metrics**: [`init_metrics`] installs a Prometheus recorder; the
//!   dispatch shells record through [`metrics::record_request`] and
//!   [`metrics::record_fallback_render`].
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! let registry = init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! if let Some(registry) = registry {
//!     println!("{}", registry.render());
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
pub fn init_telemetry(
    logging: &LogConfig,
    metrics: &MetricsConfig,
) -> TelemetryResult<Option<MetricsRegistry>> {
    init_logging(logging)?;
    init_metrics(metrics)
}
