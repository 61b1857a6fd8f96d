//! Server errors.
//!
//! Render failures never surface here: the dispatch shells turn them into
//! error pages. These are startup and transport failures.

use std::net::SocketAddr;

use daedalus_config::ConfigError;
use daedalus_router::RouteError;
use thiserror::Error;

/// Errors raised while starting or running a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind address could not be parsed.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure, e.g. while scanning the pages directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The site configuration is invalid or the adapter cannot serve it.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route pattern failed to compile.
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_transparent() {
        let err: ServerError = ConfigError::AdapterCapability {
            adapter: "edge".to_string(),
            feature: "split",
        }
        .into();
        assert_eq!(err.to_string(), "adapter 'edge' does not support split");
    }

    #[test]
    fn test_invalid_address_message() {
        let err = ServerError::InvalidAddress {
            addr: "nowhere".to_string(),
            reason: "invalid socket address syntax".to_string(),
        };
        assert!(err.to_string().contains("'nowhere'"));
    }
}
