//! Telemetry error types.

use thiserror::Error;

/// Errors raised while setting up logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber or recorder is already installed.
    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    /// The log filter could not be parsed.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected filter string.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// Installing the Prometheus recorder failed.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),
}
