//! The context handed to middleware, pages and endpoints.
//!
//! An [`ApiContext`] is derived from a [`RenderContext`] once per request.
//! Every field is either owned or a shared handle, so cloning it is cheap
//! and clones observe the same cookies and locals.

use std::sync::Arc;

use daedalus_router::{I18nRouting, Params, RouteDescriptor};
use http::{Extensions, Method, StatusCode, Uri};

use crate::context::RenderContext;
use crate::cookies::CookieJar;
use crate::environment::Environment;
use crate::error::{RenderError, RenderResult};
use crate::i18n;
use crate::locals::Locals;
use crate::static_paths::Props;
use crate::types::{Request, Response, ResponseExt};

/// Generator string advertised to pages.
pub const GENERATOR: &str = concat!("Daedalus v", env!("CARGO_PKG_VERSION"));

/// Request-scoped API exposed to user code.
#[derive(Debug, Clone)]
pub struct ApiContext {
    request: Arc<Request>,
    pathname: String,
    params: Params,
    props: Props,
    site: Option<String>,
    cookies: CookieJar,
    locals: Locals,
    client_address: Option<String>,
    adapter_name: String,
    route: Arc<RouteDescriptor>,
    i18n: Option<Arc<I18nRouting>>,
    annotations: Extensions,
    status: StatusCode,
}

impl ApiContext {
    /// Derives the API context for a render.
    ///
    /// The cookie jar is built from the request's `Cookie` headers.
    #[must_use]
    pub fn from_render_context(ctx: &RenderContext, env: &Environment) -> Self {
        Self {
            request: Arc::clone(ctx.request()),
            pathname: ctx.pathname().to_string(),
            params: ctx.params().clone(),
            props: ctx.props().clone(),
            site: env.site().map(str::to_string),
            cookies: CookieJar::from_headers(ctx.request().headers()),
            locals: ctx.locals().clone(),
            client_address: ctx.client_address().map(str::to_string),
            adapter_name: env.adapter_name().unwrap_or("unknown").to_string(),
            route: Arc::clone(ctx.route()),
            i18n: ctx.i18n().cloned(),
            annotations: ctx.annotations().clone(),
            status: ctx.status(),
        }
    }

    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URL.
    #[must_use]
    pub fn url(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the matched pathname.
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Returns the route params.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns one route param.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns the static path props.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Returns the configured site URL.
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    /// Returns the generator string.
    #[must_use]
    pub fn generator(&self) -> &'static str {
        GENERATOR
    }

    /// Returns the request cookie jar.
    #[must_use]
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Returns the request locals.
    #[must_use]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Returns the client address.
    ///
    /// Fails when the host adapter did not provide one.
    pub fn client_address(&self) -> RenderResult<&str> {
        self.client_address
            .as_deref()
            .ok_or_else(|| RenderError::ClientAddressNotAvailable {
                adapter: self.adapter_name.clone(),
            })
    }

    /// Returns the matched route.
    #[must_use]
    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    /// Returns the locale settings, when i18n is enabled.
    #[must_use]
    pub fn i18n(&self) -> Option<&I18nRouting> {
        self.i18n.as_deref()
    }

    /// Returns annotations set before rendering.
    #[must_use]
    pub fn annotations(&self) -> &Extensions {
        &self.annotations
    }

    /// Returns the default response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the locale of the current pathname.
    #[must_use]
    pub fn current_locale(&self) -> Option<String> {
        self.i18n
            .as_deref()
            .map(|i18n| i18n::current_locale(&self.pathname, i18n))
    }

    /// Returns the configured locale the browser prefers most.
    #[must_use]
    pub fn preferred_locale(&self) -> Option<String> {
        self.i18n
            .as_deref()
            .and_then(|i18n| i18n::preferred_locale(self.request.headers(), i18n))
    }

    /// Returns every configured locale the browser accepts.
    #[must_use]
    pub fn preferred_locale_list(&self) -> Vec<String> {
        self.i18n
            .as_deref()
            .map(|i18n| i18n::preferred_locale_list(self.request.headers(), i18n))
            .unwrap_or_default()
    }

    /// Builds a redirect response. Defaults to `302 Found`.
    #[must_use]
    pub fn redirect(&self, location: &str, status: Option<StatusCode>) -> Response {
        Response::redirect(location, status.unwrap_or(StatusCode::FOUND))
    }
}
