//! The production dispatch shell.
//!
//! [`App`] takes a buffered request, picks a route from the manifest,
//! renders it through the pipeline and falls back to the site's error
//! pages when the render ends in a 404 or 500.
//!
//! ```text
//! MATCHING → RENDERING → DONE
//!                 ↓
//!          ERROR_FALLBACK → DONE
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use daedalus_config::SiteConfig;
use daedalus_core::{
    Environment, Locals, RenderError, Request, Response, ResponseExt, RouteInfo, RuntimeMode,
    REROUTE_HEADER,
};
use daedalus_middleware::UnitLoader;
use daedalus_router::{
    normalize_pathname, I18nRouting, RouteDescriptor, RouteTable, RouteType, TrailingSlash,
};
use daedalus_telemetry::metrics::{record_fallback_render, record_request, UNMATCHED_ROUTE};
use http::uri::PathAndQuery;
use http::{StatusCode, Uri};

use crate::error::ServerError;
use crate::fallback::{merge_responses, FallbackStage};
use crate::render::{default_status, site_environment, strip_base, RequestScope, RouteRenderer};
use crate::static_files::StaticAssets;

/// A compiled site: its routes, assets and the loader for render units.
pub struct Manifest {
    routes: RouteTable,
    base: String,
    trailing_slash: TrailingSlash,
    assets: HashSet<String>,
    route_info: HashMap<String, RouteInfo>,
    i18n: Option<Arc<I18nRouting>>,
    loader: Arc<dyn UnitLoader>,
}

impl Manifest {
    /// Starts building a manifest.
    #[must_use]
    pub fn builder(routes: RouteTable, loader: impl UnitLoader) -> ManifestBuilder {
        ManifestBuilder {
            manifest: Self {
                routes,
                base: "/".to_string(),
                trailing_slash: TrailingSlash::default(),
                assets: HashSet::new(),
                route_info: HashMap::new(),
                i18n: None,
                loader: Arc::new(loader),
            },
        }
    }

    /// Builds a manifest from site settings.
    ///
    /// When i18n is configured, locale fallback routes are attached to the
    /// table.
    pub fn from_config(
        site: &SiteConfig,
        routes: Vec<RouteDescriptor>,
        loader: impl UnitLoader,
    ) -> Result<Self, ServerError> {
        let i18n = site.i18n.as_ref().map(daedalus_config::I18nConfig::to_routing);
        let mut table = RouteTable::builder().routes(routes);
        if let Some(i18n) = &i18n {
            table = table.i18n(i18n.clone());
        }

        let mut builder = Self::builder(table.build()?, loader)
            .base(site.base.clone())
            .trailing_slash(site.trailing_slash);
        if let Some(i18n) = i18n {
            builder = builder.i18n(i18n);
        }
        Ok(builder.build())
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the base path.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("routes", &self.routes.len())
            .field("base", &self.base)
            .field("trailing_slash", &self.trailing_slash)
            .field("assets", &self.assets.len())
            .field("i18n", &self.i18n.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Manifest`].
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    /// Sets the base path the site is mounted under.
    #[must_use]
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.manifest.base = base.into();
        self
    }

    /// Sets the trailing slash policy used for error page paths.
    #[must_use]
    pub fn trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
        self.manifest.trailing_slash = trailing_slash;
        self
    }

    /// Registers a static asset pathname, which dispatch never claims.
    #[must_use]
    pub fn asset(mut self, pathname: impl Into<String>) -> Self {
        self.manifest.assets.insert(pathname.into());
        self
    }

    /// Registers several static asset pathnames.
    #[must_use]
    pub fn assets<I, S>(mut self, pathnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest
            .assets
            .extend(pathnames.into_iter().map(Into::into));
        self
    }

    /// Attaches script and style metadata to a route.
    #[must_use]
    pub fn route_info(mut self, info: RouteInfo) -> Self {
        self.manifest.route_info.insert(info.route.clone(), info);
        self
    }

    /// Enables locale routing.
    #[must_use]
    pub fn i18n(mut self, i18n: I18nRouting) -> Self {
        self.manifest.i18n = Some(Arc::new(i18n));
        self
    }

    /// Builds the manifest.
    #[must_use]
    pub fn build(self) -> Manifest {
        self.manifest
    }
}

/// Values supplied alongside a request by the host runtime.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub(crate) route: Option<Arc<RouteDescriptor>>,
    pub(crate) locals: Option<serde_json::Value>,
    pub(crate) client_address: Option<String>,
}

impl RenderOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders this route instead of matching one.
    #[must_use]
    pub fn route(mut self, route: Arc<RouteDescriptor>) -> Self {
        self.route = Some(route);
        self
    }

    /// Seeds the request locals. Must be a JSON object.
    #[must_use]
    pub fn locals(mut self, locals: serde_json::Value) -> Self {
        self.locals = Some(locals);
        self
    }

    /// Sets the client address reported to pages and endpoints.
    #[must_use]
    pub fn client_address(mut self, address: impl Into<String>) -> Self {
        self.client_address = Some(address.into());
        self
    }
}

/// How an error page is rendered.
#[derive(Debug)]
pub struct ErrorOptions {
    status: StatusCode,
    response: Option<Response>,
    skip_middleware: bool,
}

impl ErrorOptions {
    /// Renders the error page for `status`.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            response: None,
            skip_middleware: false,
        }
    }

    /// Merges the error page with the response it replaces.
    #[must_use]
    pub fn response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    /// Renders the error page without middleware.
    #[must_use]
    pub fn skip_middleware(mut self, skip: bool) -> Self {
        self.skip_middleware = skip;
        self
    }
}

/// The production request dispatcher.
///
/// # Example
///
/// ```rust
/// use daedalus_core::{fixtures, page_fn, PageOutput};
/// use daedalus_middleware::{RenderUnit, UnitMap};
/// use daedalus_router::{RouteDescriptor, RouteTable};
/// use daedalus_server::{App, Manifest, RenderOptions};
///
/// # tokio_test::block_on(async {
/// let routes = RouteTable::from_routes([RouteDescriptor::page("/").unwrap()]);
/// let units = UnitMap::new().unit(
///     "/",
///     RenderUnit::page(page_fn(|_ctx, _api| async { Ok(PageOutput::from("home")) })),
/// );
/// let app = App::new(Manifest::builder(routes, units).build());
///
/// let response = app.render(fixtures::get("/"), RenderOptions::new()).await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # });
/// ```
pub struct App {
    routes: RouteTable,
    base: String,
    trailing_slash: TrailingSlash,
    assets: HashSet<String>,
    renderer: RouteRenderer,
    static_assets: Option<StaticAssets>,
}

impl App {
    /// Creates an app with a production environment and no static layer.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self::builder(manifest).build()
    }

    /// Starts building an app.
    #[must_use]
    pub fn builder(manifest: Manifest) -> AppBuilder {
        AppBuilder {
            manifest,
            env: None,
            static_assets: None,
        }
    }

    /// Builds an app from site settings.
    ///
    /// Fails if the configuration is invalid or the adapter lacks a
    /// feature the build needs; no request may be served in that case.
    pub fn from_config(
        site: &SiteConfig,
        routes: Vec<RouteDescriptor>,
        loader: impl UnitLoader,
    ) -> Result<Self, ServerError> {
        site.validate()?;
        site.validate_adapter()?;
        let manifest = Manifest::from_config(site, routes, loader)?;
        Ok(Self::builder(manifest)
            .environment(site_environment(site, RuntimeMode::Production))
            .static_assets(StaticAssets::new(site.build.client_dir.clone()))
            .build())
    }

    /// Returns the render environment.
    #[must_use]
    pub fn env(&self) -> &Environment {
        self.renderer.env()
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the base path.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the route that would render the request, if any.
    ///
    /// Known assets and prerendered routes are left to the static layer.
    #[must_use]
    pub fn match_request(&self, request: &Request) -> Option<Arc<RouteDescriptor>> {
        let pathname = strip_base(request.uri().path(), &self.base);
        if self.assets.contains(&pathname) {
            return None;
        }
        let route = self.routes.match_one(&pathname)?;
        if route.is_prerendered() {
            return None;
        }
        Some(Arc::clone(route))
    }

    /// Renders a request. Never fails: errors become error pages.
    pub async fn render(&self, request: Request, options: RenderOptions) -> Response {
        let started = Instant::now();
        let RenderOptions {
            route,
            locals,
            client_address,
        } = options;

        let mut scope = RequestScope {
            request: Arc::new(collapse_slashes(request)),
            locals: Locals::new(),
            client_address,
        };
        let route = route.or_else(|| self.match_request(&scope.request));

        let response = match locals.map(Locals::from_value).transpose() {
            Err(err) => {
                tracing::error!(error = %err, "invalid request locals");
                self.fallback(&scope, ErrorOptions::new(StatusCode::INTERNAL_SERVER_ERROR))
                    .await
            }
            Ok(locals) => {
                if let Some(locals) = locals {
                    scope.locals = locals;
                }
                match &route {
                    Some(route) => self.render_route(&scope, route).await,
                    None => {
                        tracing::debug!(path = %scope.request.uri().path(), "no route matched");
                        self.fallback(&scope, ErrorOptions::new(StatusCode::NOT_FOUND))
                            .await
                    }
                }
            }
        };

        let mut response = response;
        response.headers_mut().remove(REROUTE_HEADER);
        record_request(
            route.as_ref().map_or(UNMATCHED_ROUTE, |r| r.route()),
            response.status().as_u16(),
            started.elapsed(),
        );
        response
    }

    /// Renders the error page for a status, merged with `options.response`.
    pub async fn render_error(&self, request: Request, options: ErrorOptions) -> Response {
        let scope = RequestScope {
            request: Arc::new(request),
            locals: Locals::new(),
            client_address: None,
        };
        let mut response = self.fallback(&scope, options).await;
        response.headers_mut().remove(REROUTE_HEADER);
        response
    }

    async fn render_route(&self, scope: &RequestScope, route: &Arc<RouteDescriptor>) -> Response {
        let pathname = strip_base(scope.request.uri().path(), &self.base);
        let status = default_status(route, &pathname);

        match self
            .renderer
            .render(scope, route, &pathname, status, FallbackStage::Primary)
            .await
        {
            Ok(response) => {
                let status = response.status();
                let reroute = route.route_type() != RouteType::Endpoint
                    && (status == StatusCode::NOT_FOUND
                        || status == StatusCode::INTERNAL_SERVER_ERROR)
                    && !response.skips_reroute();
                if reroute {
                    return self
                        .fallback(scope, ErrorOptions::new(status).response(response))
                        .await;
                }
                response
            }
            Err(RenderError::EndpointNotFound { response }) => {
                tracing::debug!(route = route.route(), %pathname, "endpoint not found");
                let mut options = ErrorOptions::new(StatusCode::NOT_FOUND);
                options.response = response;
                self.fallback(scope, options).await
            }
            Err(err) => {
                let status = err.status_code();
                if err.is_middleware_contract() {
                    tracing::error!(route = route.route(), %pathname, error = %err, "middleware contract violated");
                } else if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(route = route.route(), %pathname, error = %err, "render failed");
                } else {
                    tracing::debug!(route = route.route(), %pathname, error = %err, "route not rendered");
                }
                self.fallback(scope, ErrorOptions::new(status)).await
            }
        }
    }

    async fn fallback(&self, scope: &RequestScope, options: ErrorOptions) -> Response {
        let ErrorOptions {
            status,
            response: original,
            skip_middleware,
        } = options;
        record_fallback_render(status.as_u16());

        let Some(error_route) = self.routes.find(&format!("/{}", status.as_u16())).cloned() else {
            return merge_responses(Response::with_status(status), original, None);
        };

        if error_route.is_prerendered() {
            let page = match &self.static_assets {
                Some(assets) => assets.error_page(status).await,
                None => None,
            };
            return match page {
                Some(page) => merge_responses(page, original, Some(status)),
                None => {
                    tracing::warn!(%status, "prerendered error page missing from static assets");
                    merge_responses(Response::with_status(status), original, None)
                }
            };
        }

        let pathname = self.error_pathname(status);
        match self
            .renderer
            .render_error_page(scope, &error_route, &pathname, status, skip_middleware)
            .await
        {
            Some(page) => merge_responses(page, original, None),
            None => merge_responses(Response::with_status(status), original, None),
        }
    }

    fn error_pathname(&self, status: StatusCode) -> String {
        let mut pathname = format!("/{}", status.as_u16());
        if self.trailing_slash == TrailingSlash::Always {
            pathname.push('/');
        }
        pathname
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.routes.len())
            .field("base", &self.base)
            .field("static_assets", &self.static_assets)
            .finish_non_exhaustive()
    }
}

/// Builder for [`App`].
pub struct AppBuilder {
    manifest: Manifest,
    env: Option<Environment>,
    static_assets: Option<StaticAssets>,
}

impl AppBuilder {
    /// Sets the render environment.
    #[must_use]
    pub fn environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets where prerendered error pages are read from.
    #[must_use]
    pub fn static_assets(mut self, assets: StaticAssets) -> Self {
        self.static_assets = Some(assets);
        self
    }

    /// Builds the app.
    #[must_use]
    pub fn build(self) -> App {
        let Manifest {
            routes,
            base,
            trailing_slash,
            assets,
            route_info,
            i18n,
            loader,
        } = self.manifest;
        let env = self
            .env
            .unwrap_or_else(|| Environment::builder().mode(RuntimeMode::Production).build());
        let renderer = RouteRenderer::new(env, loader, i18n, &base, trailing_slash, route_info);
        App {
            routes,
            base,
            trailing_slash,
            assets,
            renderer,
            static_assets: self.static_assets,
        }
    }
}

/// Collapses duplicate slashes in the request path, keeping the query.
fn collapse_slashes(mut request: Request) -> Request {
    let path = request.uri().path();
    if !path.contains("//") {
        return request;
    }
    let mut path_and_query = normalize_pathname(path).into_owned();
    if let Some(query) = request.uri().query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let mut parts = request.uri().clone().into_parts();
    let rebuilt = PathAndQuery::try_from(path_and_query)
        .map_err(http::Error::from)
        .and_then(|pq| {
            parts.path_and_query = Some(pq);
            Uri::from_parts(parts).map_err(http::Error::from)
        });
    match rebuilt {
        Ok(uri) => *request.uri_mut() = uri,
        Err(e) => tracing::debug!(error = %e, "could not normalize request path"),
    }
    request
}
