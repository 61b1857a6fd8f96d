//! The render pipeline.
//!
//! [`Pipeline::render_route`] turns a [`RenderContext`] and its
//! [`RenderUnit`] into a response:
//!
//! 1. Pre-render hooks run in registration order and may annotate the
//!    context.
//! 2. An [`ApiContext`] is derived from the context.
//! 3. The route renders according to its type, through the middleware when
//!    one is supplied:
//!
//! | Route type | Terminal render |
//! |---|---|
//! | `page` | the unit's page component |
//! | `fallback` | a bodyless 404 |
//! | `redirect` | a 3xx with `Location` |
//! | `endpoint` | the handler for the request method, then the [`EndpointResultHandler`] |
//!
//! Middleware is passed per call rather than stored on the pipeline, so one
//! pipeline can serve concurrent requests.

use std::sync::Arc;

use daedalus_core::{
    body_bytes, full, ApiContext, Environment, PageOutput, RenderContext,
    RenderError, RenderResult, Request, Response, ResponseExt, NOT_FOUND_MARKER,
    RESPONSE_MARKER_HEADER,
};
use daedalus_router::{encode_param, Params, RouteDescriptor, RouteType};
use http::{header, HeaderValue, Method, StatusCode};

use crate::middleware::{call_middleware, Middleware, Next};
use crate::unit::RenderUnit;

/// A hook run before every render. It may only touch the context's annotations.
pub type BeforeRenderHook = Arc<dyn Fn(&mut RenderContext) + Send + Sync + 'static>;

/// Converts an endpoint's response for the deployment target.
pub trait EndpointResultHandler: Send + Sync + 'static {
    /// Handles the response the endpoint (and its middleware) produced.
    fn handle(&self, request: &Request, response: Response) -> RenderResult<Response>;
}

/// Returns endpoint responses unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl EndpointResultHandler for Passthrough {
    fn handle(&self, _request: &Request, response: Response) -> RenderResult<Response> {
        Ok(response)
    }
}

/// Renders routes. Shared by every request of a server.
pub struct Pipeline {
    env: Environment,
    hooks: Vec<BeforeRenderHook>,
    endpoint_handler: Arc<dyn EndpointResultHandler>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("env", &self.env)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder(env: Environment) -> PipelineBuilder {
        PipelineBuilder::new(env)
    }

    /// Returns the environment.
    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Returns the number of registered pre-render hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Renders a route.
    ///
    /// Outgoing cookies set through the API context are appended to the
    /// response as `Set-Cookie` headers.
    pub async fn render_route(
        &self,
        mut ctx: RenderContext,
        unit: &RenderUnit,
        middleware: Option<&dyn Middleware>,
    ) -> RenderResult<Response> {
        for hook in &self.hooks {
            hook(&mut ctx);
        }
        let api = ApiContext::from_render_context(&ctx, &self.env);
        let route_type = ctx.route().route_type();
        tracing::debug!(
            route = ctx.route().route(),
            pathname = ctx.pathname(),
            route_type = %route_type,
            "rendering route"
        );

        let mut response = match route_type {
            RouteType::Page | RouteType::Fallback | RouteType::Redirect => {
                let ctx = &ctx;
                let next = Next::render(move |api: &ApiContext| {
                    let api = api.clone();
                    Box::pin(self.render_page(ctx, unit, api))
                });
                match middleware {
                    Some(middleware) => call_middleware(middleware, &api, next).await?,
                    None => next.run(&api).await?,
                }
            }
            RouteType::Endpoint => {
                let ctx = &ctx;
                let next = Next::render(move |api: &ApiContext| {
                    let api = api.clone();
                    Box::pin(render_endpoint(ctx, unit, api))
                });
                let response = match middleware {
                    Some(middleware) => call_middleware(middleware, &api, next).await?,
                    None => next.run(&api).await?,
                };
                self.endpoint_handler.handle(ctx.request(), response)?
            }
        };

        api.cookies().apply(response.headers_mut());
        Ok(response)
    }

    async fn render_page(
        &self,
        ctx: &RenderContext,
        unit: &RenderUnit,
        api: ApiContext,
    ) -> RenderResult<Response> {
        let route = ctx.route();
        match route.route_type() {
            RouteType::Fallback => Ok(Response::with_status(StatusCode::NOT_FOUND)),
            RouteType::Redirect => redirect_response(route, ctx.params(), ctx.request().method()),
            _ => {
                let page = unit
                    .page_component()
                    .ok_or_else(|| RenderError::MissingExport {
                        route: route.route().to_string(),
                        missing: "page",
                    })?;
                let output = page.render(ctx, api).await?;
                self.page_response(ctx.status(), output).await
            }
        }
    }

    async fn page_response(&self, status: StatusCode, output: PageOutput) -> RenderResult<Response> {
        let mut response = match output {
            PageOutput::Response(response) => return Ok(response),
            PageOutput::Html(html) => Response::html(html),
            PageOutput::Stream(body) if self.env.streaming() => {
                let mut response = http::Response::new(body);
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                response
            }
            PageOutput::Stream(body) => Response::html(body_bytes(body).await),
        };
        *response.status_mut() = status;
        Ok(response)
    }
}

async fn render_endpoint(
    ctx: &RenderContext,
    unit: &RenderUnit,
    api: ApiContext,
) -> RenderResult<Response> {
    let handlers = unit
        .endpoint_handlers()
        .ok_or_else(|| RenderError::MissingExport {
            route: ctx.route().route().to_string(),
            missing: "endpoint",
        })?;
    match handlers.handler_for(ctx.request().method()) {
        Some(handler) => handler.call(api).await,
        None => {
            tracing::debug!(
                route = ctx.route().route(),
                method = %ctx.request().method(),
                "no endpoint handler for method"
            );
            let mut response = http::Response::new(full(""));
            *response.status_mut() = StatusCode::NOT_FOUND;
            response.headers_mut().insert(
                RESPONSE_MARKER_HEADER,
                HeaderValue::from_static(NOT_FOUND_MARKER),
            );
            Ok(response)
        }
    }
}

/// Status used by a redirect route for a request method.
#[must_use]
pub fn redirect_status(route: &RouteDescriptor, method: &Method) -> StatusCode {
    if let Some(status) = route
        .redirect()
        .and_then(|r| r.status)
        .and_then(|s| StatusCode::from_u16(s).ok())
    {
        return status;
    }
    if *method == Method::GET || *method == Method::HEAD {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::PERMANENT_REDIRECT
    }
}

/// Location a redirect route points to, with params substituted.
#[must_use]
pub fn redirect_location(route: &RouteDescriptor, params: &Params) -> String {
    if let Some(target) = route.redirect_route() {
        return target.generate(params);
    }
    let Some(redirect) = route.redirect() else {
        return "/".to_string();
    };
    if redirect.is_external() || !redirect.destination.contains('[') {
        return redirect.destination.clone();
    }

    let mut location = redirect.destination.clone();
    for (name, value) in params {
        let value = value.unwrap_or("");
        location = location
            .replace(&format!("[...{name}]"), &encode_param(value, true))
            .replace(&format!("[{name}]"), &encode_param(value, false));
    }
    daedalus_router::normalize_pathname(&location).into_owned()
}

fn redirect_response(
    route: &RouteDescriptor,
    params: &Params,
    method: &Method,
) -> RenderResult<Response> {
    let location = redirect_location(route, params);
    let value = HeaderValue::from_str(&location).map_err(|_| {
        RenderError::render(format!(
            "redirect from {} has an invalid location: {location:?}",
            route.route()
        ))
    })?;
    let mut response = Response::with_status(redirect_status(route, method));
    response.headers_mut().insert(header::LOCATION, value);
    Ok(response)
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    env: Environment,
    hooks: Vec<BeforeRenderHook>,
    endpoint_handler: Arc<dyn EndpointResultHandler>,
}

impl PipelineBuilder {
    /// Creates a builder with no hooks and a passthrough endpoint handler.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            hooks: Vec::new(),
            endpoint_handler: Arc::new(Passthrough),
        }
    }

    /// Registers a pre-render hook. Hooks run in registration order.
    #[must_use]
    pub fn before_render<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RenderContext) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Sets the endpoint result handler.
    #[must_use]
    pub fn endpoint_handler(mut self, handler: impl EndpointResultHandler) -> Self {
        self.endpoint_handler = Arc::new(handler);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            env: self.env,
            hooks: self.hooks,
            endpoint_handler: self.endpoint_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::redirect_unit;
    use daedalus_core::{endpoint_fn, fixtures, page_fn, EndpointHandlers, SetCookie};

    fn pipeline() -> Pipeline {
        Pipeline::builder(Environment::default()).build()
    }

    async fn text(response: Response) -> String {
        String::from_utf8(body_bytes(response.into_body()).await.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_page_renders_with_context_status() {
        let unit = RenderUnit::page(page_fn(|ctx, _api| async move {
            Ok(PageOutput::Html(format!("<p>{}</p>", ctx.pathname())))
        }));
        let route = RouteDescriptor::page("/404").unwrap();
        let ctx = RenderContext::builder(Arc::new(fixtures::get("/404")), Arc::new(route))
            .status(StatusCode::NOT_FOUND)
            .build(&Environment::default(), None)
            .unwrap()
            .found()
            .unwrap();

        let response = pipeline().render_route(ctx, &unit, None).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "<p>/404</p>");
    }

    #[tokio::test]
    async fn test_missing_page_export() {
        let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
        let err = pipeline()
            .render_route(ctx, &RenderUnit::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingExport { missing: "page", .. }));
    }

    #[tokio::test]
    async fn test_fallback_route_renders_not_found() {
        let route = RouteDescriptor::builder("/it/about")
            .route_type(RouteType::Fallback)
            .build()
            .unwrap();
        let ctx = fixtures::render_context("/it/about", route);
        let response = pipeline().render_route(ctx, &RenderUnit::new(), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_redirect_status_by_method() {
        let route = RouteDescriptor::builder("/old/[slug]")
            .redirect_to("/new/[slug]")
            .build()
            .unwrap();
        let ctx = fixtures::render_context("/old/abc", route.clone());
        let response = pipeline().render_route(ctx, &RenderUnit::new(), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/new/abc");

        let ctx = RenderContext::builder(
            Arc::new(fixtures::request(Method::POST, "/old/abc")),
            Arc::new(route),
        )
        .build(&Environment::default(), None)
        .unwrap()
        .found()
        .unwrap();
        let response = pipeline().render_route(ctx, &RenderUnit::new(), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    }

    #[test]
    fn test_redirect_explicit_status_and_external() {
        let route = RouteDescriptor::builder("/docs")
            .redirect_to("https://docs.example.com")
            .redirect_status(307)
            .build()
            .unwrap();
        assert_eq!(redirect_status(&route, &Method::GET), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            redirect_location(&route, &Params::new()),
            "https://docs.example.com"
        );
    }

    #[tokio::test]
    async fn test_redirect_encodes_decoded_params() {
        let route = RouteDescriptor::builder("/old/[slug]")
            .redirect_to("/new/[slug]")
            .build()
            .unwrap();
        let ctx = fixtures::render_context("/old/a%0Ab", route);
        let response = pipeline()
            .render_route(ctx, &redirect_unit(), None)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/new/a%0Ab");
    }

    #[tokio::test]
    async fn test_invalid_redirect_destination_is_an_error() {
        let route = RouteDescriptor::builder("/old")
            .redirect_to("https://example.com/\u{7f}")
            .build()
            .unwrap();
        let ctx = fixtures::render_context("/old", route);
        let result = pipeline().render_route(ctx, &redirect_unit(), None).await;
        assert!(matches!(result, Err(RenderError::Render { .. })));
    }

    #[test]
    fn test_redirect_to_route_uses_generate() {
        let target = Arc::new(RouteDescriptor::page("/posts/[id]").unwrap());
        let route = RouteDescriptor::builder("/p/[id]")
            .redirect_route(target)
            .build()
            .unwrap();
        let params = route.params_for("/p/7").unwrap();
        assert_eq!(redirect_location(&route, &params), "/posts/7");
    }

    #[tokio::test]
    async fn test_endpoint_method_dispatch_and_missing_method() {
        let unit = RenderUnit::endpoint(EndpointHandlers::new().get(endpoint_fn(|api| async move {
            api.cookies().set(SetCookie::new("seen", "1"));
            Ok(Response::text(StatusCode::OK, "posts"))
        })));
        let route = RouteDescriptor::endpoint("/api/posts").unwrap();

        let ctx = fixtures::render_context("/api/posts", route.clone());
        let response = pipeline().render_route(ctx, &unit, None).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::SET_COOKIE).unwrap(), "seen=1");
        assert_eq!(text(response).await, "posts");

        let ctx = RenderContext::builder(
            Arc::new(fixtures::request(Method::DELETE, "/api/posts")),
            Arc::new(route),
        )
        .build(&Environment::default(), None)
        .unwrap()
        .found()
        .unwrap();
        let response = pipeline().render_route(ctx, &unit, None).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(RESPONSE_MARKER_HEADER).unwrap(),
            NOT_FOUND_MARKER
        );
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        #[derive(Clone)]
        struct Trail(Vec<&'static str>);

        let pipeline = Pipeline::builder(Environment::default())
            .before_render(|ctx| {
                ctx.annotations_mut().insert(Trail(vec!["first"]));
            })
            .before_render(|ctx| {
                if let Some(trail) = ctx.annotations_mut().get_mut::<Trail>() {
                    trail.0.push("second");
                }
            })
            .build();
        assert_eq!(pipeline.hook_count(), 2);

        let unit = RenderUnit::page(page_fn(|_ctx, api| async move {
            let trail = api.annotations().get::<Trail>().map(|t| t.0.join(",")).unwrap_or_default();
            Ok(PageOutput::Html(trail))
        }));
        let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
        let response = pipeline.render_route(ctx, &unit, None).await.unwrap();
        assert_eq!(text(response).await, "first,second");
    }

    #[tokio::test]
    async fn test_stream_is_buffered_when_streaming_disabled() {
        let env = Environment::builder().streaming(false).build();
        let pipeline = Pipeline::builder(env).build();
        let unit = RenderUnit::page(page_fn(|_ctx, _api| async {
            Ok(PageOutput::Stream(full("<html></html>")))
        }));
        let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
        let response = pipeline.render_route(ctx, &unit, None).await.unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(text(response).await, "<html></html>");
    }
}
