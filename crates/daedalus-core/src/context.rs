//! Per-request render context.
//!
//! A [`RenderContext`] is an immutable snapshot of everything one render
//! needs: the request, the matched route, resolved params and props,
//! injected head elements, locale settings and the default status. It is
//! created once per request by [`RenderContextBuilder::build`] and dropped
//! when the request completes.
//!
//! The only mutable part is the annotation map, which pre-render hooks use
//! to attach data (such as the resolved locale) before the route renders.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use daedalus_core::{Environment, RenderContext, Resolution};
//! use daedalus_router::RouteDescriptor;
//!
//! let request = Arc::new(http::Request::get("/blog/hello").body(bytes::Bytes::new()).unwrap());
//! let route = Arc::new(RouteDescriptor::page("/blog/[slug]").unwrap());
//!
//! let resolution = RenderContext::builder(request, route)
//!     .build(&Environment::default(), None)
//!     .unwrap();
//!
//! let Resolution::Found(ctx) = resolution else { unreachable!() };
//! assert_eq!(ctx.params().get("slug"), Some("hello"));
//! assert_eq!(ctx.status(), http::StatusCode::OK);
//! ```

use std::sync::Arc;

use daedalus_router::{normalize_pathname, I18nRouting, Locale, Params, RouteDescriptor, RoutingStrategy};
use http::{Extensions, StatusCode};

use crate::assets::{RouteInfo, SsrElement};
use crate::environment::Environment;
use crate::error::{RenderError, RenderResult};
use crate::locals::Locals;
use crate::static_paths::{resolve_static_path, Props, StaticPathResult, StaticPathsFn};
use crate::types::Request;

/// Immutable per-request render inputs.
#[derive(Debug, Clone)]
pub struct RenderContext {
    request: Arc<Request>,
    pathname: String,
    route: Arc<RouteDescriptor>,
    params: Params,
    props: Props,
    scripts: Vec<SsrElement>,
    styles: Vec<SsrElement>,
    links: Vec<SsrElement>,
    i18n: Option<Arc<I18nRouting>>,
    status: StatusCode,
    locals: Locals,
    client_address: Option<String>,
    annotations: Extensions,
}

impl RenderContext {
    /// Starts building a context for a request and its matched route.
    #[must_use]
    pub fn builder(request: Arc<Request>, route: Arc<RouteDescriptor>) -> RenderContextBuilder {
        RenderContextBuilder::new(request, route)
    }

    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Returns the pathname the route was matched against.
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Returns the matched route.
    #[must_use]
    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    /// Returns the resolved params.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the props of the matching static path.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Returns the module scripts to inject.
    #[must_use]
    pub fn scripts(&self) -> &[SsrElement] {
        &self.scripts
    }

    /// Returns the style elements to inject.
    #[must_use]
    pub fn styles(&self) -> &[SsrElement] {
        &self.styles
    }

    /// Returns the link elements to inject.
    #[must_use]
    pub fn links(&self) -> &[SsrElement] {
        &self.links
    }

    /// Returns the locale routing settings, when i18n is enabled.
    #[must_use]
    pub fn i18n(&self) -> Option<&Arc<I18nRouting>> {
        self.i18n.as_ref()
    }

    /// Returns the configured locales.
    #[must_use]
    pub fn locales(&self) -> &[Locale] {
        self.i18n.as_deref().map_or(&[], |i18n| i18n.locales.as_slice())
    }

    /// Returns the locale routing strategy.
    #[must_use]
    pub fn routing(&self) -> Option<RoutingStrategy> {
        self.i18n.as_deref().map(|i18n| i18n.strategy)
    }

    /// Returns the default locale.
    #[must_use]
    pub fn default_locale(&self) -> Option<&str> {
        self.i18n.as_deref().map(|i18n| i18n.default_locale.as_str())
    }

    /// Returns the default response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the request locals.
    #[must_use]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Returns the client address supplied by the host.
    #[must_use]
    pub fn client_address(&self) -> Option<&str> {
        self.client_address.as_deref()
    }

    /// Returns the annotations set by pre-render hooks.
    #[must_use]
    pub fn annotations(&self) -> &Extensions {
        &self.annotations
    }

    /// Returns the annotations for writing. Only pre-render hooks should call this.
    pub fn annotations_mut(&mut self) -> &mut Extensions {
        &mut self.annotations
    }
}

/// Outcome of building a render context.
#[derive(Debug)]
pub enum Resolution {
    /// The context is ready to render.
    Found(RenderContext),
    /// The route needs an enumerated static path and none matched.
    NoMatchingStaticPath {
        /// Route pattern.
        route: String,
        /// Requested pathname.
        pathname: String,
    },
}

impl Resolution {
    /// Converts a miss into [`RenderError::NoMatchingStaticPath`].
    pub fn found(self) -> RenderResult<RenderContext> {
        match self {
            Self::Found(ctx) => Ok(ctx),
            Self::NoMatchingStaticPath { route, pathname } => {
                Err(RenderError::NoMatchingStaticPath { route, pathname })
            }
        }
    }
}

/// Builder for [`RenderContext`].
#[derive(Debug)]
pub struct RenderContextBuilder {
    request: Arc<Request>,
    route: Arc<RouteDescriptor>,
    pathname: Option<String>,
    status: StatusCode,
    route_info: Option<RouteInfo>,
    i18n: Option<Arc<I18nRouting>>,
    locals: Locals,
    client_address: Option<String>,
}

impl RenderContextBuilder {
    fn new(request: Arc<Request>, route: Arc<RouteDescriptor>) -> Self {
        Self {
            request,
            route,
            pathname: None,
            status: StatusCode::OK,
            route_info: None,
            i18n: None,
            locals: Locals::new(),
            client_address: None,
        }
    }

    /// Overrides the pathname. Defaults to the request path.
    #[must_use]
    pub fn pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    /// Sets the default response status.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the route's asset metadata.
    #[must_use]
    pub fn route_info(mut self, info: Option<RouteInfo>) -> Self {
        self.route_info = info;
        self
    }

    /// Enables locale fields.
    #[must_use]
    pub fn i18n(mut self, i18n: Option<Arc<I18nRouting>>) -> Self {
        self.i18n = i18n;
        self
    }

    /// Sets the request locals.
    #[must_use]
    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn client_address(mut self, address: Option<String>) -> Self {
        self.client_address = address;
        self
    }

    /// Resolves params and props, then assembles the context.
    ///
    /// Performs no I/O. A missing static path is reported as
    /// [`Resolution::NoMatchingStaticPath`], not as an error.
    pub fn build(
        self,
        env: &Environment,
        static_paths: Option<&StaticPathsFn>,
    ) -> RenderResult<Resolution> {
        let pathname = match self.pathname {
            Some(pathname) => pathname,
            None => normalize_pathname(self.request.uri().path()).into_owned(),
        };

        let (params, props) = match resolve_static_path(&self.route, &pathname, static_paths, env)? {
            StaticPathResult::Resolved { params, props } => (params, props),
            StaticPathResult::NoMatchingStaticPath => {
                return Ok(Resolution::NoMatchingStaticPath {
                    route: self.route.route().to_string(),
                    pathname,
                });
            }
        };

        let (scripts, styles, links) = match &self.route_info {
            Some(info) => (
                info.script_elements(env),
                info.style_elements(env),
                info.link_elements(env),
            ),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        Ok(Resolution::Found(RenderContext {
            request: self.request,
            pathname,
            route: self.route,
            params,
            props,
            scripts,
            styles,
            links,
            i18n: self.i18n,
            status: self.status,
            locals: self.locals,
            client_address: self.client_address,
            annotations: Extensions::new(),
        }))
    }
}
