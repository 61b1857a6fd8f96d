//! Transport configuration.
//!
//! ```rust
//! use daedalus_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .static_dir("dist/client")
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:8080");
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use daedalus_config::SiteConfig;

use crate::error::ServerError;

/// Default bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:4321";

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Settings for [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    shutdown_timeout: Duration,
    static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Starts building a configuration.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Derives transport settings from a site configuration.
    ///
    /// Static assets are served from `build.client_dir`.
    #[must_use]
    pub fn from_site(site: &SiteConfig) -> Self {
        Self::builder()
            .http_addr(site.server.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(site.server.shutdown_timeout_secs))
            .static_dir(site.build.client_dir.clone())
            .build()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        self.http_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
                addr: self.http_addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Returns how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the directory served ahead of dynamic dispatch.
    #[must_use]
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    static_dir: Option<PathBuf>,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            static_dir: None,
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Serves files from `dir` before dispatching.
    #[must_use]
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            static_dir: self.static_dir,
        }
    }
}
