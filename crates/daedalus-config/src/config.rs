//! The root site configuration.

use std::path::PathBuf;

use daedalus_router::TrailingSlash;
use daedalus_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{
    AdapterConfig, BuildConfig, ConfigError, I18nConfig, LoggingConfig, OutputMode,
    ServerSettings,
};

/// Complete site configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables on top.
///
/// # Example
///
/// ```
/// use daedalus_config::{OutputMode, SiteConfig};
///
/// let config = SiteConfig::default();
/// assert_eq!(config.base, "/");
/// assert_eq!(config.output, OutputMode::Server);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Public origin, e.g. `https://example.com`.
    #[serde(default)]
    pub site: Option<String>,

    /// Path the site is mounted under.
    #[serde(default = "default_base")]
    pub base: String,

    /// Trailing slash policy.
    #[serde(default)]
    pub trailing_slash: TrailingSlash,

    /// Output mode.
    #[serde(default)]
    pub output: OutputMode,

    /// Build output.
    #[serde(default)]
    pub build: BuildConfig,

    /// HTTP server.
    #[serde(default)]
    pub server: ServerSettings,

    /// Internationalization.
    #[serde(default)]
    pub i18n: Option<I18nConfig>,

    /// Deployment adapter.
    #[serde(default)]
    pub adapter: Option<AdapterConfig>,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory scanned for pages by the dev server.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    /// Files copied verbatim to the client output.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: None,
            base: default_base(),
            trailing_slash: TrailingSlash::default(),
            output: OutputMode::default(),
            build: BuildConfig::default(),
            server: ServerSettings::default(),
            i18n: None,
            adapter: None,
            logging: LoggingConfig::default(),
            pages_dir: default_pages_dir(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_base() -> String {
    "/".to_string()
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("src/pages")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

impl SiteConfig {
    /// Checks values that deserialize fine but make no sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base.starts_with('/') {
            return Err(ConfigError::invalid_value("base", "must start with '/'"));
        }

        if self.server.http_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if let Some(i18n) = &self.i18n {
            if !i18n.declares(&i18n.default_locale) {
                return Err(ConfigError::invalid_value(
                    "i18n.default_locale",
                    format!("'{}' is not listed in i18n.locales", i18n.default_locale),
                ));
            }
            for (from, to) in &i18n.fallback {
                for locale in [from, to] {
                    if !i18n.declares(locale) {
                        return Err(ConfigError::invalid_value(
                            "i18n.fallback",
                            format!("'{locale}' is not listed in i18n.locales"),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks that the configured adapter supports what the build needs.
    ///
    /// A failure here is fatal: the server must not start.
    pub fn validate_adapter(&self) -> Result<(), ConfigError> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };
        let supported = &adapter.supported;
        let missing = if self.build.split && !supported.split {
            Some("split")
        } else if self.build.edge_middleware && !supported.edge_middleware {
            Some("edge_middleware")
        } else if self.output.renders_on_demand() && !supported.server_output {
            Some("server_output")
        } else if self.output == OutputMode::Static && !supported.static_output {
            Some("static_output")
        } else if self
            .i18n
            .as_ref()
            .is_some_and(|i18n| !i18n.domains.is_empty())
            && !supported.i18n_domains
        {
            Some("i18n_domains")
        } else {
            None
        };

        match missing {
            Some(feature) => {
                tracing::error!(adapter = %adapter.name, feature, "adapter capability mismatch");
                Err(ConfigError::AdapterCapability {
                    adapter: adapter.name.clone(),
                    feature,
                })
            }
            None => Ok(()),
        }
    }

    /// Returns the base path without a trailing slash; empty for `/`.
    #[must_use]
    pub fn base_prefix(&self) -> &str {
        self.base.trim_end_matches('/')
    }

    /// Development preset: pretty debug logs, no streaming.
    ///
    /// ```
    /// use daedalus_config::SiteConfig;
    ///
    /// let config = SiteConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.server.streaming = false;
        config.server.http_addr = "127.0.0.1:4321".to_string();
        config
    }

    /// Production preset: JSON info logs, streaming on.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.server.streaming = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdapterFeatures, I18nRoutingConfig};
    use daedalus_router::Locale;
    use indexmap::IndexMap;

    fn i18n(fallback: &[(&str, &str)]) -> I18nConfig {
        I18nConfig {
            default_locale: "en".to_string(),
            locales: vec![Locale::Code("en".to_string()), Locale::Code("es".to_string())],
            routing: I18nRoutingConfig::default(),
            fallback: fallback
                .iter()
                .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
                .collect(),
            domains: IndexMap::new(),
        }
    }

    #[test]
    fn test_base_must_be_absolute() {
        let config = SiteConfig {
            base: "docs".to_string(),
            ..SiteConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "base"
        ));
    }

    #[test]
    fn test_default_locale_must_be_declared() {
        let mut locales = i18n(&[]);
        locales.default_locale = "fr".to_string();
        let config = SiteConfig {
            i18n: Some(locales),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_locales_must_be_declared() {
        let ok = SiteConfig {
            i18n: Some(i18n(&[("es", "en")])),
            ..SiteConfig::default()
        };
        assert!(ok.validate().is_ok());

        let bad = SiteConfig {
            i18n: Some(i18n(&[("it", "en")])),
            ..SiteConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_adapter_without_server_output() {
        let config = SiteConfig {
            adapter: Some(AdapterConfig {
                name: "static-host".to_string(),
                supported: AdapterFeatures {
                    server_output: false,
                    ..AdapterFeatures::default()
                },
            }),
            ..SiteConfig::default()
        };
        match config.validate_adapter() {
            Err(ConfigError::AdapterCapability { adapter, feature }) => {
                assert_eq!(adapter, "static-host");
                assert_eq!(feature, "server_output");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let static_site = SiteConfig {
            output: OutputMode::Static,
            ..config
        };
        assert!(static_site.validate_adapter().is_ok());
    }

    #[test]
    fn test_adapter_split_and_edge_middleware() {
        let mut config = SiteConfig {
            adapter: Some(AdapterConfig {
                name: "node".to_string(),
                supported: AdapterFeatures::default(),
            }),
            ..SiteConfig::default()
        };
        config.build.split = true;
        assert!(matches!(
            config.validate_adapter(),
            Err(ConfigError::AdapterCapability { feature: "split", .. })
        ));

        config.build.split = false;
        config.build.edge_middleware = true;
        assert!(matches!(
            config.validate_adapter(),
            Err(ConfigError::AdapterCapability { feature: "edge_middleware", .. })
        ));
    }

    #[test]
    fn test_no_adapter_always_passes() {
        let mut config = SiteConfig::default();
        config.build.split = true;
        assert!(config.validate_adapter().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(!SiteConfig::development().server.streaming);
        assert_eq!(SiteConfig::production().logging.format, LogFormat::Json);
        assert_eq!(SiteConfig::default().base_prefix(), "");
        let docs = SiteConfig {
            base: "/docs/".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(docs.base_prefix(), "/docs");
    }
}
