//! Typed site configuration for Daedalus.
//!
//! - TOML and JSON files
//! - `.env` files via `dotenvy`
//! - Environment overrides (`DAEDALUS__SERVER__HTTP_ADDR=127.0.0.1:8080`)
//! - Strict parsing: unknown fields are errors
//! - Deployment adapter capability checks
//!
//! # Configuration File Format
//!
//! ```toml
//! site = "https://example.com"
//! base = "/"
//! trailing_slash = "ignore"
//! output = "server"
//!
//! [build]
//! format = "directory"
//! client_dir = "dist/client"
//!
//! [server]
//! http_addr = "0.0.0.0:4321"
//! headers = { x-frame-options = "DENY" }
//!
//! [i18n]
//! default_locale = "en"
//! locales = ["en", "es"]
//! fallback = { es = "en" }
//!
//! [adapter]
//! name = "node"
//! supported = { server_output = true, split = false }
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::SiteConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    AdapterConfig, AdapterFeatures, BuildConfig, BuildFormat, I18nConfig, I18nRoutingConfig,
    LoggingConfig, OutputMode, ServerSettings,
};
