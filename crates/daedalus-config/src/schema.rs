//! Configuration sections.

use std::path::PathBuf;

use daedalus_router::{I18nRouting, Locale, RoutingStrategy};
use daedalus_telemetry::{LogConfig, LogFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What the build emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Every route is prerendered.
    Static,
    /// Prerendered by default, with on-demand routes opting in.
    Hybrid,
    /// Rendered on demand by default.
    #[default]
    Server,
}

impl OutputMode {
    /// Returns true if any route may be rendered on demand.
    #[must_use]
    pub const fn renders_on_demand(&self) -> bool {
        !matches!(self, Self::Static)
    }
}

/// How prerendered pages are written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFormat {
    /// `/about` becomes `about/index.html`.
    #[default]
    Directory,
    /// `/about` becomes `about.html`.
    File,
    /// Follows the source file layout.
    Preserve,
}

/// Build output settings.
///
/// # Example
///
/// ```
/// use daedalus_config::{BuildConfig, BuildFormat};
///
/// let build = BuildConfig::default();
/// assert_eq!(build.format, BuildFormat::Directory);
/// assert_eq!(build.client_dir, std::path::PathBuf::from("dist/client"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct BuildConfig {
    /// Prerendered page layout.
    pub format: BuildFormat,
    /// Client assets and prerendered pages.
    pub client_dir: PathBuf,
    /// Server bundle.
    pub server_dir: PathBuf,
    /// Emit one server entry per route.
    pub split: bool,
    /// Run middleware at the edge.
    pub edge_middleware: bool,
    /// Prefix prepended to asset URLs, e.g. a CDN origin.
    pub assets_prefix: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            format: BuildFormat::default(),
            client_dir: PathBuf::from("dist/client"),
            server_dir: PathBuf::from("dist/server"),
            split: false,
            edge_middleware: false,
            assets_prefix: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Headers added to every dev server response.
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Whether page bodies are streamed.
    #[serde(default = "default_true")]
    pub streaming: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            headers: IndexMap::new(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            streaming: true,
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:4321".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Locale URL rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct I18nRoutingConfig {
    /// Prefix the default locale too. Ignored when `strategy` is set.
    #[serde(default)]
    pub prefix_default_locale: bool,

    /// Redirect `/` to the default locale when every locale is prefixed.
    #[serde(default = "default_true")]
    pub redirect_to_default_locale: bool,

    /// Explicit strategy.
    #[serde(default)]
    pub strategy: Option<RoutingStrategy>,
}

impl Default for I18nRoutingConfig {
    fn default() -> Self {
        Self {
            prefix_default_locale: false,
            redirect_to_default_locale: true,
            strategy: None,
        }
    }
}

impl I18nRoutingConfig {
    /// Returns the effective strategy.
    #[must_use]
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy.unwrap_or(if self.prefix_default_locale {
            RoutingStrategy::PrefixAlways
        } else {
            RoutingStrategy::PrefixOtherLocales
        })
    }
}

/// Internationalization settings.
///
/// ```toml
/// [i18n]
/// default_locale = "en"
/// locales = ["en", "es", { path = "portugues", codes = ["pt", "pt-BR"] }]
///
/// [i18n.fallback]
/// es = "en"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct I18nConfig {
    /// Locale served when the URL names none.
    pub default_locale: String,

    /// Supported locales.
    pub locales: Vec<Locale>,

    /// URL rules.
    #[serde(default)]
    pub routing: I18nRoutingConfig,

    /// Locale to fall back to when a page is missing.
    #[serde(default)]
    pub fallback: IndexMap<String, String>,

    /// Locale to domain mapping.
    #[serde(default)]
    pub domains: IndexMap<String, String>,
}

impl I18nConfig {
    /// Converts to the routing settings used by the router and middleware.
    #[must_use]
    pub fn to_routing(&self) -> I18nRouting {
        let mut routing = I18nRouting::new(self.default_locale.clone())
            .strategy(self.routing.strategy());
        routing.locales = self.locales.clone();
        routing.redirect_to_default_locale = self.routing.redirect_to_default_locale;
        routing.fallback = self.fallback.clone();
        routing
    }

    /// Returns true if `locale` names a configured locale path or code.
    #[must_use]
    pub fn declares(&self, locale: &str) -> bool {
        self.locales
            .iter()
            .any(|l| l.path() == locale || l.codes().contains(&locale))
    }
}

/// What a deployment adapter can do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AdapterFeatures {
    /// One server entry per route.
    pub split: bool,
    /// Middleware running at the edge.
    pub edge_middleware: bool,
    /// Locale-specific domains.
    pub i18n_domains: bool,
    /// Serving fully static builds.
    pub static_output: bool,
    /// Rendering on demand.
    pub server_output: bool,
}

impl Default for AdapterFeatures {
    fn default() -> Self {
        Self {
            split: false,
            edge_middleware: false,
            i18n_domains: false,
            static_output: true,
            server_output: true,
        }
    }
}

/// Deployment adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    /// Adapter name, reported by the API context.
    pub name: String,

    /// Supported features.
    #[serde(default)]
    pub supported: AdapterFeatures,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Builds the telemetry logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            level: self.level.clone(),
            ..base
        }
    }
}
