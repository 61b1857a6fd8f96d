//! Route rendering shared by the production and development shells.

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_config::SiteConfig;
use daedalus_core::{
    Environment, Locals, RenderContext, RenderError, RenderResult, Request, Response, RouteInfo,
    RuntimeMode, NOT_FOUND_MARKER, RESPONSE_MARKER_HEADER,
};
use daedalus_middleware::{
    resolve_locale, sequence, EndpointResultHandler, I18nMiddleware, Middleware, Pipeline,
    RenderUnit, UnitLoader,
};
use daedalus_router::{I18nRouting, RouteDescriptor, RouteType, TrailingSlash};
use http::StatusCode;

use crate::fallback::FallbackStage;

/// Per-request values passed alongside the request.
///
/// The host runtime supplies these through
/// [`RenderOptions`](crate::RenderOptions); they are never attached to the
/// request itself.
#[derive(Debug, Clone)]
pub(crate) struct RequestScope {
    pub(crate) request: Arc<Request>,
    pub(crate) locals: Locals,
    pub(crate) client_address: Option<String>,
}

/// A route ready to render, or a miss on its static paths.
pub(crate) enum Prepared {
    Ready(RenderContext, Arc<RenderUnit>),
    NoMatchingStaticPath,
}

/// Turns the "no endpoint existed" marker into [`RenderError::EndpointNotFound`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkedNotFound;

impl EndpointResultHandler for MarkedNotFound {
    fn handle(&self, _request: &Request, mut response: Response) -> RenderResult<Response> {
        let marked = response
            .headers()
            .get(RESPONSE_MARKER_HEADER)
            .is_some_and(|v| v.as_bytes() == NOT_FOUND_MARKER.as_bytes());
        if marked {
            response.headers_mut().remove(RESPONSE_MARKER_HEADER);
            return Err(RenderError::endpoint_not_found(response));
        }
        Ok(response)
    }
}

/// Everything needed to render a route of a manifest.
pub(crate) struct RouteRenderer {
    pipeline: Pipeline,
    loader: Arc<dyn UnitLoader>,
    i18n: Option<Arc<I18nRouting>>,
    i18n_middleware: Option<Arc<dyn Middleware>>,
    route_info: HashMap<String, RouteInfo>,
}

impl RouteRenderer {
    pub(crate) fn new(
        env: Environment,
        loader: Arc<dyn UnitLoader>,
        i18n: Option<Arc<I18nRouting>>,
        base: &str,
        trailing_slash: TrailingSlash,
        route_info: HashMap<String, RouteInfo>,
    ) -> Self {
        let mut pipeline = Pipeline::builder(env).endpoint_handler(MarkedNotFound);
        let i18n_middleware = i18n.as_ref().map(|i18n| {
            let middleware = I18nMiddleware::new(Arc::clone(i18n))
                .base(base)
                .trailing_slash(trailing_slash);
            Arc::new(middleware) as Arc<dyn Middleware>
        });
        if i18n.is_some() {
            pipeline = pipeline.before_render(resolve_locale);
        }
        Self {
            pipeline: pipeline.build(),
            loader,
            i18n,
            i18n_middleware,
            route_info,
        }
    }

    pub(crate) fn env(&self) -> &Environment {
        self.pipeline.env()
    }

    /// Loads the unit and builds the context.
    pub(crate) async fn prepare(
        &self,
        scope: &RequestScope,
        route: &Arc<RouteDescriptor>,
        pathname: &str,
        status: StatusCode,
    ) -> RenderResult<Prepared> {
        let unit = if route.route_type() == RouteType::Redirect {
            daedalus_middleware::redirect_unit()
        } else {
            self.loader.load(route).await?
        };
        let resolution = RenderContext::builder(Arc::clone(&scope.request), Arc::clone(route))
            .pathname(pathname)
            .status(status)
            .route_info(self.route_info.get(route.route()).cloned())
            .i18n(self.i18n.clone())
            .locals(scope.locals.clone())
            .client_address(scope.client_address.clone())
            .build(self.env(), unit.static_paths())?;
        Ok(match resolution {
            daedalus_core::Resolution::Found(ctx) => Prepared::Ready(ctx, unit),
            daedalus_core::Resolution::NoMatchingStaticPath { route, pathname } => {
                tracing::debug!(route, pathname, "no matching static path");
                Prepared::NoMatchingStaticPath
            }
        })
    }

    /// Renders a prepared route.
    pub(crate) async fn render_prepared(
        &self,
        ctx: RenderContext,
        unit: &RenderUnit,
        stage: FallbackStage,
    ) -> RenderResult<Response> {
        let middleware = self.middleware_for(unit, stage);
        self.pipeline
            .render_route(ctx, unit, middleware.as_deref())
            .await
    }

    /// Prepares and renders a route. A static path miss is an error here.
    pub(crate) async fn render(
        &self,
        scope: &RequestScope,
        route: &Arc<RouteDescriptor>,
        pathname: &str,
        status: StatusCode,
        stage: FallbackStage,
    ) -> RenderResult<Response> {
        match self.prepare(scope, route, pathname, status).await? {
            Prepared::Ready(ctx, unit) => self.render_prepared(ctx, &unit, stage).await,
            Prepared::NoMatchingStaticPath => Err(RenderError::NoMatchingStaticPath {
                route: route.route().to_string(),
                pathname: pathname.to_string(),
            }),
        }
    }

    /// Renders an error page, retrying once without middleware.
    ///
    /// Returns `None` once every stage has failed.
    pub(crate) async fn render_error_page(
        &self,
        scope: &RequestScope,
        route: &Arc<RouteDescriptor>,
        pathname: &str,
        status: StatusCode,
        skip_middleware: bool,
    ) -> Option<Response> {
        let mut stage = FallbackStage::error_page(skip_middleware);
        while !stage.is_abort() {
            match self.render(scope, route, pathname, status, stage).await {
                Ok(page) => return Some(page),
                Err(err) => {
                    tracing::error!(%status, ?stage, error = %err, "error page failed to render");
                    stage = stage.next();
                }
            }
        }
        None
    }

    /// Locale routing first, then the unit's own middleware.
    fn middleware_for(
        &self,
        unit: &RenderUnit,
        stage: FallbackStage,
    ) -> Option<Arc<dyn Middleware>> {
        if !stage.runs_middleware() {
            return None;
        }
        match (&self.i18n_middleware, unit.on_request()) {
            (Some(i18n), Some(own)) => Some(Arc::new(sequence([
                Arc::clone(i18n),
                Arc::clone(own),
            ]))),
            (Some(i18n), None) => Some(Arc::clone(i18n)),
            (None, own) => own.cloned(),
        }
    }
}

/// Builds the render environment for a site.
///
/// Static output enumerates static paths in both modes, so the dev handler
/// reports the same misses a build would.
pub(crate) fn site_environment(site: &SiteConfig, mode: RuntimeMode) -> Environment {
    let mut env = Environment::builder()
        .mode(mode)
        .streaming(site.server.streaming)
        .ssr(site.output.renders_on_demand());
    if let Some(origin) = &site.site {
        env = env.site(origin.clone());
    }
    if let Some(adapter) = &site.adapter {
        env = env.adapter_name(adapter.name.clone());
    }
    env.build()
}

/// Status a route renders with before the page decides otherwise.
pub(crate) fn default_status(route: &RouteDescriptor, pathname: &str) -> StatusCode {
    match route.route() {
        "/404" => StatusCode::NOT_FOUND,
        "/500" => StatusCode::INTERNAL_SERVER_ERROR,
        _ if route.matches_fallback(pathname) => StatusCode::FOUND,
        _ => StatusCode::OK,
    }
}

/// Strips the base path from a request path.
pub(crate) fn strip_base(path: &str, base: &str) -> String {
    let base = base.trim_end_matches('/');
    let stripped = match path.strip_prefix(base) {
        Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::ResponseExt;
    use http::HeaderValue;

    #[test]
    fn test_marked_not_found() {
        let request = daedalus_core::fixtures::get("/api/posts");
        let mut response = Response::with_status(StatusCode::NOT_FOUND);
        response.headers_mut().insert(
            RESPONSE_MARKER_HEADER,
            HeaderValue::from_static(NOT_FOUND_MARKER),
        );
        match MarkedNotFound.handle(&request, response) {
            Err(RenderError::EndpointNotFound { response: Some(r) }) => {
                assert!(!r.headers().contains_key(RESPONSE_MARKER_HEADER));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let plain = Response::with_status(StatusCode::NOT_FOUND);
        assert!(MarkedNotFound.handle(&request, plain).is_ok());
    }

    #[test]
    fn test_default_status() {
        let not_found = RouteDescriptor::page("/404").unwrap();
        let server_error = RouteDescriptor::page("/500").unwrap();
        let about = RouteDescriptor::page("/about").unwrap();
        assert_eq!(default_status(&not_found, "/404"), StatusCode::NOT_FOUND);
        assert_eq!(
            default_status(&server_error, "/500"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(default_status(&about, "/about"), StatusCode::OK);
    }

    #[test]
    fn test_default_status_for_locale_fallback() {
        let es = Arc::new(RouteDescriptor::page("/es/about").unwrap());
        let about = RouteDescriptor::builder("/about")
            .fallback_route(es)
            .build()
            .unwrap();
        assert_eq!(default_status(&about, "/es/about"), StatusCode::FOUND);
    }

    #[test]
    fn test_strip_base() {
        assert_eq!(strip_base("/docs/intro", "/docs"), "/intro");
        assert_eq!(strip_base("/docs", "/docs/"), "/");
        assert_eq!(strip_base("/docsify", "/docs"), "/docsify");
        assert_eq!(strip_base("/about", "/"), "/about");
    }

    #[test]
    fn test_site_environment() {
        let mut site = SiteConfig::production();
        site.site = Some("https://example.com".to_string());
        site.output = daedalus_config::OutputMode::Static;
        let env = site_environment(&site, RuntimeMode::Production);
        assert_eq!(env.site(), Some("https://example.com"));
        assert!(!env.ssr());

        let dev = site_environment(&site, RuntimeMode::Development);
        assert!(!dev.ssr());
        assert!(dev.mode().is_development());

        site.output = daedalus_config::OutputMode::Server;
        assert!(site_environment(&site, RuntimeMode::Development).ssr());
    }
}
