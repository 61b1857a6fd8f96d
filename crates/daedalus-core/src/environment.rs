//! Process-lifetime rendering configuration.
//!
//! One [`Environment`] exists per server instance. It is built before the
//! first request and shared read-only afterwards; the only interior
//! mutability is the [`RouteCache`] of enumerated static paths.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::static_paths::RouteCache;

/// Whether the server runs interactively or as a production build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuntimeMode {
    /// Interactive dev server.
    Development,
    /// Built output.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Returns true in development mode.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// A registered component renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    /// Renderer name, e.g. `"markdown"`.
    pub name: String,
    /// Client-side entrypoint, if the renderer hydrates in the browser.
    pub client_entrypoint: Option<String>,
}

impl Renderer {
    /// Creates a server-only renderer.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_entrypoint: None,
        }
    }
}

/// Maps an asset specifier to its public URL.
pub type ResolveFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Shared rendering configuration.
///
/// # Example
///
/// ```rust
/// use daedalus_core::{Environment, RuntimeMode};
///
/// let env = Environment::builder()
///     .mode(RuntimeMode::Production)
///     .site("https://example.com")
///     .resolve(|specifier| format!("/_assets/{specifier}"))
///     .build();
///
/// assert_eq!(env.site(), Some("https://example.com"));
/// assert_eq!(env.resolve("app.js"), "/_assets/app.js");
/// assert!(env.ssr());
/// ```
#[derive(Clone)]
pub struct Environment {
    mode: RuntimeMode,
    streaming: bool,
    site: Option<String>,
    renderers: Vec<Renderer>,
    client_directives: IndexMap<String, String>,
    resolve: ResolveFn,
    ssr: bool,
    adapter_name: Option<String>,
    route_cache: RouteCache,
}

impl Environment {
    /// Starts building an environment.
    #[must_use]
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Returns the runtime mode.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Returns true if page bodies may be streamed.
    #[must_use]
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// Returns the configured site origin.
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    /// Returns the registered renderers.
    #[must_use]
    pub fn renderers(&self) -> &[Renderer] {
        &self.renderers
    }

    /// Returns the client directive registry (name to script).
    #[must_use]
    pub fn client_directives(&self) -> &IndexMap<String, String> {
        &self.client_directives
    }

    /// Resolves an asset specifier to a public URL.
    #[must_use]
    pub fn resolve(&self, specifier: &str) -> String {
        (self.resolve)(specifier)
    }

    /// Returns true if routes are rendered on demand.
    #[must_use]
    pub fn ssr(&self) -> bool {
        self.ssr
    }

    /// Returns the deployment adapter name.
    #[must_use]
    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter_name.as_deref()
    }

    /// Returns the static path cache.
    #[must_use]
    pub fn route_cache(&self) -> &RouteCache {
        &self.route_cache
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("mode", &self.mode)
            .field("streaming", &self.streaming)
            .field("site", &self.site)
            .field("renderers", &self.renderers)
            .field("ssr", &self.ssr)
            .field("adapter_name", &self.adapter_name)
            .finish_non_exhaustive()
    }
}

impl Default for Environment {
    fn default() -> Self {
        EnvironmentBuilder::default().build()
    }
}

/// Builder for [`Environment`].
pub struct EnvironmentBuilder {
    mode: RuntimeMode,
    streaming: bool,
    site: Option<String>,
    renderers: Vec<Renderer>,
    client_directives: IndexMap<String, String>,
    resolve: Option<ResolveFn>,
    ssr: bool,
    adapter_name: Option<String>,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::default(),
            streaming: true,
            site: None,
            renderers: Vec::new(),
            client_directives: IndexMap::new(),
            resolve: None,
            ssr: true,
            adapter_name: None,
        }
    }
}

impl EnvironmentBuilder {
    /// Sets the runtime mode.
    #[must_use]
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables streaming page bodies.
    #[must_use]
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets the site origin.
    #[must_use]
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Registers a renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: Renderer) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Registers a client directive.
    #[must_use]
    pub fn client_directive(mut self, name: impl Into<String>, script: impl Into<String>) -> Self {
        self.client_directives.insert(name.into(), script.into());
        self
    }

    /// Sets the asset resolution function. Defaults to the identity.
    #[must_use]
    pub fn resolve<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.resolve = Some(Arc::new(resolve));
        self
    }

    /// Sets whether routes are rendered on demand.
    #[must_use]
    pub fn ssr(mut self, ssr: bool) -> Self {
        self.ssr = ssr;
        self
    }

    /// Sets the deployment adapter name.
    #[must_use]
    pub fn adapter_name(mut self, name: impl Into<String>) -> Self {
        self.adapter_name = Some(name.into());
        self
    }

    /// Builds the environment.
    #[must_use]
    pub fn build(self) -> Environment {
        Environment {
            mode: self.mode,
            streaming: self.streaming,
            site: self.site,
            renderers: self.renderers,
            client_directives: self.client_directives,
            resolve: self
                .resolve
                .unwrap_or_else(|| Arc::new(|specifier: &str| specifier.to_string())),
            ssr: self.ssr,
            adapter_name: self.adapter_name,
            route_cache: RouteCache::new(),
        }
    }
}
