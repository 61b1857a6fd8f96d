//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding earlier ones:
//!
//! 1. Built-in defaults (or a preset)
//! 2. A `.toml` or `.json` file
//! 3. An optional `.env` file, loaded into the process environment
//! 4. Environment variables named `PREFIX__SECTION__KEY`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use daedalus_router::TrailingSlash;
use daedalus_telemetry::LogFormat;

use crate::{ConfigError, OutputMode, SiteConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "DAEDALUS";

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("daedalus.toml")?
///     .with_dotenv()
///     .with_env_prefix("DAEDALUS")
///     .load()?;
///
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SiteConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from [`SiteConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SiteConfig::default(),
            env_prefix: None,
        }
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SiteConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SiteConfig::production();
        self
    }

    /// Loads a configuration file. The format follows the extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        self.config = parse(&content, &format)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(self)
    }

    /// Loads a configuration file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `"toml"` or `"json"` format.
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("base = \"/docs\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.base, "/docs");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Loads `.env` from the working directory or its parents, if present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
        self
    }

    /// Loads a specific dotenv file.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|e| {
            ConfigError::read_error(path, std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;
        Ok(self)
    }

    /// Enables environment overrides under `prefix`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<SiteConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> SiteConfig {
        self.config
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if key.starts_with(&marker) {
                self.apply_env_var(&key, &value, prefix)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SITE"] => config.site = non_empty(value),
            ["BASE"] => config.base = value.to_string(),
            ["TRAILING_SLASH"] => {
                config.trailing_slash = match value.to_lowercase().as_str() {
                    "always" => TrailingSlash::Always,
                    "never" => TrailingSlash::Never,
                    "ignore" => TrailingSlash::Ignore,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'always', 'never' or 'ignore'",
                        ))
                    }
                };
            }
            ["OUTPUT"] => {
                config.output = match value.to_lowercase().as_str() {
                    "static" => OutputMode::Static,
                    "hybrid" => OutputMode::Hybrid,
                    "server" => OutputMode::Server,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'static', 'hybrid' or 'server'",
                        ))
                    }
                };
            }
            ["PAGES_DIR"] => config.pages_dir = PathBuf::from(value),
            ["PUBLIC_DIR"] => config.public_dir = PathBuf::from(value),

            ["BUILD", "CLIENT_DIR"] => config.build.client_dir = PathBuf::from(value),
            ["BUILD", "SERVER_DIR"] => config.build.server_dir = PathBuf::from(value),
            ["BUILD", "SPLIT"] => config.build.split = bool_var(key, value)?,
            ["BUILD", "EDGE_MIDDLEWARE"] => config.build.edge_middleware = bool_var(key, value)?,
            ["BUILD", "ASSETS_PREFIX"] => config.build.assets_prefix = non_empty(value),

            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVER", "STREAMING"] => config.server.streaming = bool_var(key, value)?,
            ["SERVER", "HEADERS", name] => {
                let name = name.to_lowercase().replace('_', "-");
                config.server.headers.insert(name, value.to_string());
            }

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            _ => tracing::debug!(key, "ignoring unknown configuration variable"),
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<SiteConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parses a boolean the way shells spell them.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let dev = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        let prod = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(prod.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_toml_string() {
        let toml = r#"
            site = "https://example.com"
            base = "/docs"
            trailing_slash = "always"

            [server]
            http_addr = "127.0.0.1:3000"

            [server.headers]
            x-frame-options = "DENY"

            [i18n]
            default_locale = "en"
            locales = ["en", "es"]
            routing = { prefix_default_locale = true }
        "#;
        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.site.as_deref(), Some("https://example.com"));
        assert_eq!(config.trailing_slash, TrailingSlash::Always);
        assert_eq!(config.server.headers.get("x-frame-options").unwrap(), "DENY");
        let i18n = config.i18n.unwrap();
        assert_eq!(
            i18n.routing.strategy(),
            daedalus_router::RoutingStrategy::PrefixAlways
        );
    }

    #[test]
    fn test_loader_json_string() {
        let json = r#"{"output": "hybrid", "build": {"format": "file"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.output, OutputMode::Hybrid);
        assert_eq!(config.build.format, crate::BuildFormat::File);
    }

    #[test]
    fn test_loader_rejects_unknown_fields() {
        let result = ConfigLoader::new().with_string("colour = \"blue\"", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_unsupported_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_loader_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daedalus.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "pages_dir = \"pages\"").unwrap();

        let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
        assert_eq!(config.pages_dir, PathBuf::from("pages"));
    }

    #[test]
    fn test_loader_missing_file() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/daedalus.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/daedalus.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.base, "/");
    }

    #[test]
    fn test_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "DAEDALUS_TEST_DOTENV_MARKER=loaded\n").unwrap();

        ConfigLoader::new().with_dotenv_file(&path).unwrap();
        assert_eq!(env::var("DAEDALUS_TEST_DOTENV_MARKER").unwrap(), "loaded");
        assert!(ConfigLoader::new()
            .with_dotenv_file(dir.path().join("missing.env"))
            .is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "TEST",
                vars(&[
                    ("TEST__SERVER__HTTP_ADDR", "127.0.0.1:9000"),
                    ("TEST__SERVER__HEADERS__X_POWERED_BY", "daedalus"),
                    ("TEST__LOGGING__FORMAT", "pretty"),
                    ("TEST__TRAILING_SLASH", "never"),
                    ("TEST__BUILD__SPLIT", "yes"),
                    ("OTHER__SERVER__HTTP_ADDR", "ignored"),
                ]),
            )
            .unwrap();
        let config = loader.load_unvalidated();

        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.server.headers.get("x-powered-by").unwrap(), "daedalus");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.trailing_slash, TrailingSlash::Never);
        assert!(config.build.split);
    }

    #[test]
    fn test_env_override_errors() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_var("TEST__SERVER__SHUTDOWN_TIMEOUT_SECS", "soon", "TEST")
            .unwrap_err();
        assert!(err.to_string().contains("TEST__SERVER__SHUTDOWN_TIMEOUT_SECS"));
        assert!(loader.apply_env_var("TEST__OUTPUT", "edge", "TEST").is_err());
        assert!(loader.apply_env_var("TEST__UNKNOWN", "x", "TEST").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
