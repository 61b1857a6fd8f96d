//! The development request handler.
//!
//! Unlike [`App`](crate::App), the dev handler builds its route table by
//! scanning the pages directory, tries every matching route in turn and
//! shows a plain error document when rendering fails.

use std::sync::Arc;
use std::time::Instant;

use daedalus_config::SiteConfig;
use daedalus_core::{
    Locals, RenderError, RenderResult, Request, Response, ResponseExt, RuntimeMode,
    REROUTE_HEADER,
};
use daedalus_middleware::UnitLoader;
use daedalus_router::{scan_pages, RouteDescriptor, RouteTable, RouteType, TrailingSlash};
use daedalus_telemetry::metrics::{record_request, UNMATCHED_ROUTE};
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use parking_lot::RwLock;

use crate::app::RenderOptions;
use crate::error::ServerError;
use crate::fallback::{merge_responses, FallbackStage};
use crate::render::{default_status, site_environment, strip_base, Prepared, RequestScope, RouteRenderer};

/// Serves a site straight from its pages directory.
pub struct DevHandler {
    config: SiteConfig,
    routes: RwLock<Arc<RouteTable>>,
    renderer: RouteRenderer,
}

impl DevHandler {
    /// Scans `config.pages_dir` and creates the handler.
    pub fn new(config: SiteConfig, loader: impl UnitLoader) -> Result<Self, ServerError> {
        config.validate()?;
        let routes = scan_routes(&config)?;
        Ok(Self::with_routes(config, routes, loader))
    }

    /// Creates the handler over an existing route table.
    #[must_use]
    pub fn with_routes(config: SiteConfig, routes: RouteTable, loader: impl UnitLoader) -> Self {
        let i18n = config
            .i18n
            .as_ref()
            .map(|i18n| Arc::new(i18n.to_routing()));
        let renderer = RouteRenderer::new(
            site_environment(&config, RuntimeMode::Development),
            Arc::new(loader),
            i18n,
            &config.base,
            config.trailing_slash,
            std::collections::HashMap::new(),
        );
        Self {
            config,
            routes: RwLock::new(Arc::new(routes)),
            renderer,
        }
    }

    /// Returns the current route table.
    #[must_use]
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes.read())
    }

    /// Returns the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Rescans the pages directory after files changed.
    ///
    /// Cached static paths are dropped. Returns the new route count.
    pub fn reload(&self) -> Result<usize, ServerError> {
        let routes = scan_routes(&self.config)?;
        let count = routes.len();
        *self.routes.write() = Arc::new(routes);
        self.renderer.env().route_cache().clear();
        tracing::info!(routes = count, pages_dir = %self.config.pages_dir.display(), "routes reloaded");
        Ok(count)
    }

    /// Handles a request. Never fails: errors become error documents.
    pub async fn handle(&self, request: Request, options: RenderOptions) -> Response {
        let started = Instant::now();
        let routes = self.routes();
        let RenderOptions {
            route,
            locals,
            client_address,
        } = options;
        let mut scope = RequestScope {
            request: Arc::new(request),
            locals: Locals::new(),
            client_address,
        };
        let pathname = strip_base(scope.request.uri().path(), &self.config.base);

        let result = match locals.map(Locals::from_value).transpose() {
            Ok(locals) => {
                if let Some(locals) = locals {
                    scope.locals = locals;
                }
                match route {
                    Some(route) => self.render_one(&routes, &scope, &route, &pathname).await,
                    None => self.dispatch(&routes, &scope, &pathname).await,
                }
            }
            Err(err) => Err(err),
        };

        let (label, mut response) = match result {
            Ok((route, response)) => (route, response),
            Err(err) => (None, self.server_error(&routes, &scope, &err).await),
        };
        response.headers_mut().remove(REROUTE_HEADER);
        self.apply_headers(&mut response);
        record_request(
            label.as_deref().unwrap_or(UNMATCHED_ROUTE),
            response.status().as_u16(),
            started.elapsed(),
        );
        response
    }

    async fn dispatch(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        pathname: &str,
    ) -> RenderResult<(Option<String>, Response)> {
        if let Some(rendered) = self.try_candidates(routes, scope, pathname).await? {
            return Ok(rendered);
        }
        if let Some(stripped) = strip_html_suffix(pathname, self.config.trailing_slash) {
            tracing::debug!(pathname, %stripped, "retrying without .html");
            if let Some(rendered) = self.try_candidates(routes, scope, &stripped).await? {
                return Ok(rendered);
            }
        }
        tracing::debug!(pathname, "no route matched");
        Ok((None, self.not_found(routes, scope, None).await))
    }

    /// Renders the first candidate that resolves a static path.
    async fn try_candidates(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        pathname: &str,
    ) -> RenderResult<Option<(Option<String>, Response)>> {
        let mut candidates = routes.match_all(pathname);
        if candidates.is_empty() {
            candidates.extend(routes.match_one(pathname));
        }
        for route in candidates {
            let status = default_status(route, pathname);
            match self.renderer.prepare(scope, route, pathname, status).await? {
                Prepared::NoMatchingStaticPath => continue,
                Prepared::Ready(ctx, unit) => {
                    let response = self
                        .finish(routes, scope, route, ctx, &unit)
                        .await?;
                    return Ok(Some((Some(route.route().to_string()), response)));
                }
            }
        }
        Ok(None)
    }

    async fn render_one(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        route: &Arc<RouteDescriptor>,
        pathname: &str,
    ) -> RenderResult<(Option<String>, Response)> {
        let status = default_status(route, pathname);
        let label = Some(route.route().to_string());
        match self.renderer.prepare(scope, route, pathname, status).await? {
            Prepared::Ready(ctx, unit) => {
                let response = self.finish(routes, scope, route, ctx, &unit).await?;
                Ok((label, response))
            }
            Prepared::NoMatchingStaticPath => Ok((label, self.not_found(routes, scope, None).await)),
        }
    }

    /// Renders a prepared route, sending a 404 through the site's 404 page once.
    async fn finish(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        route: &RouteDescriptor,
        ctx: daedalus_core::RenderContext,
        unit: &daedalus_middleware::RenderUnit,
    ) -> RenderResult<Response> {
        match self
            .renderer
            .render_prepared(ctx, unit, FallbackStage::Primary)
            .await
        {
            Ok(response)
                if response.status() == StatusCode::NOT_FOUND
                    && route.route_type() != RouteType::Endpoint
                    && route.route() != "/404"
                    && !response.skips_reroute() =>
            {
                Ok(self.not_found(routes, scope, Some(response)).await)
            }
            Ok(response) => Ok(response),
            Err(RenderError::EndpointNotFound { response }) => {
                Ok(self.not_found(routes, scope, response).await)
            }
            Err(err) => Err(err),
        }
    }

    async fn not_found(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        original: Option<Response>,
    ) -> Response {
        let status = StatusCode::NOT_FOUND;
        let page = match routes.find("/404") {
            Some(route) => {
                self.renderer
                    .render_error_page(scope, route, "/404", status, false)
                    .await
            }
            None => None,
        };
        let page = page.unwrap_or_else(|| {
            error_document(status, &format!("No page found for {}", scope.request.uri().path()))
        });
        merge_responses(page, original, None)
    }

    async fn server_error(
        &self,
        routes: &RouteTable,
        scope: &RequestScope,
        err: &RenderError,
    ) -> Response {
        tracing::error!(path = %scope.request.uri().path(), error = %err, "render failed");
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        if let Some(route) = routes.find("/500") {
            if let Some(page) = self
                .renderer
                .render_error_page(scope, route, "/500", status, false)
                .await
            {
                return page;
            }
        }
        error_document(status, &err.to_string())
    }

    /// Adds the configured headers unless the response already set them.
    fn apply_headers(&self, response: &mut Response) {
        for (name, value) in &self.config.server.headers {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok());
            match parsed {
                Some((name, value)) => {
                    if !response.headers().contains_key(&name) {
                        response.headers_mut().insert(name, value);
                    }
                }
                None => tracing::warn!(header = %name, "skipping invalid server header"),
            }
        }
    }
}

impl std::fmt::Debug for DevHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevHandler")
            .field("pages_dir", &self.config.pages_dir)
            .field("routes", &self.routes.read().len())
            .finish_non_exhaustive()
    }
}

fn scan_routes(config: &SiteConfig) -> Result<RouteTable, ServerError> {
    let routes = scan_pages(&config.pages_dir, config.trailing_slash)?;
    let mut table = RouteTable::builder().routes(routes);
    if let Some(i18n) = &config.i18n {
        table = table.i18n(i18n.to_routing());
    }
    Ok(table.build()?)
}

/// `/about.html` → `/about`, `/blog/index.html` → `/blog`.
fn strip_html_suffix(pathname: &str, trailing_slash: TrailingSlash) -> Option<String> {
    if let Some(dir) = pathname
        .strip_suffix("index.html")
        .filter(|dir| dir.ends_with('/'))
    {
        if dir.len() > 1 && trailing_slash != TrailingSlash::Always {
            return Some(dir.trim_end_matches('/').to_string());
        }
        return Some(dir.to_string());
    }
    pathname.strip_suffix(".html").map(str::to_string)
}

/// A minimal HTML page describing a failure.
fn error_document(status: StatusCode, message: &str) -> Response {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let body = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1><pre>{}</pre></body></html>",
        escape_html(message)
    );
    let mut response = Response::html(body);
    *response.status_mut() = status;
    response
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::body_bytes;

    #[test]
    fn test_strip_html_suffix() {
        let ignore = TrailingSlash::Ignore;
        assert_eq!(strip_html_suffix("/about.html", ignore).as_deref(), Some("/about"));
        assert_eq!(
            strip_html_suffix("/blog/index.html", ignore).as_deref(),
            Some("/blog")
        );
        assert_eq!(strip_html_suffix("/index.html", ignore).as_deref(), Some("/"));
        assert_eq!(
            strip_html_suffix("/blog/index.html", TrailingSlash::Always).as_deref(),
            Some("/blog/")
        );
        assert_eq!(strip_html_suffix("/about", ignore), None);
        assert_eq!(strip_html_suffix("/myindex.html", ignore).as_deref(), Some("/myindex"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[tokio::test]
    async fn test_error_document() {
        let response = error_document(StatusCode::INTERNAL_SERVER_ERROR, "boom <b>");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_bytes(response.into_body()).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("500 Internal Server Error"));
        assert!(body.contains("boom &lt;b&gt;"));
    }
}
