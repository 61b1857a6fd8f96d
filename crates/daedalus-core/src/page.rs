//! Page and endpoint contracts.
//!
//! A page renders a document for a [`RenderContext`]; an endpoint handles a
//! request directly and returns a [`Response`]. Endpoints are registered per
//! HTTP method in an [`EndpointHandlers`] table.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;

use crate::api::ApiContext;
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::types::{BoxBody, BoxFuture, Response};

/// What a page produced.
pub enum PageOutput {
    /// A complete HTML document.
    Html(String),
    /// An HTML body produced incrementally.
    Stream(BoxBody),
    /// A response returned as-is, e.g. a redirect.
    Response(Response),
}

impl fmt::Debug for PageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html(html) => f.debug_tuple("Html").field(&html.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Response(response) => f.debug_tuple("Response").field(&response.status()).finish(),
        }
    }
}

impl From<String> for PageOutput {
    fn from(html: String) -> Self {
        Self::Html(html)
    }
}

impl From<&str> for PageOutput {
    fn from(html: &str) -> Self {
        Self::Html(html.to_string())
    }
}

impl From<Response> for PageOutput {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// A renderable page component.
pub trait Page: Send + Sync + 'static {
    /// Renders the page.
    fn render<'a>(
        &'a self,
        ctx: &'a RenderContext,
        api: ApiContext,
    ) -> BoxFuture<'a, RenderResult<PageOutput>>;
}

/// A [`Page`] backed by an async closure.
pub struct PageFn<F> {
    f: F,
}

impl<F, Fut> Page for PageFn<F>
where
    F: Fn(RenderContext, ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RenderResult<PageOutput>> + Send + 'static,
{
    fn render<'a>(
        &'a self,
        ctx: &'a RenderContext,
        api: ApiContext,
    ) -> BoxFuture<'a, RenderResult<PageOutput>> {
        Box::pin((self.f)(ctx.clone(), api))
    }
}

/// Wraps an async closure as a page.
///
/// ```rust
/// use daedalus_core::{page_fn, PageOutput};
///
/// let page = page_fn(|_ctx, api| async move {
///     let slug = api.param("slug").unwrap_or("index").to_string();
///     Ok(PageOutput::Html(format!("<h1>{slug}</h1>")))
/// });
/// # let _ = page;
/// ```
pub fn page_fn<F, Fut>(f: F) -> Arc<dyn Page>
where
    F: Fn(RenderContext, ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RenderResult<PageOutput>> + Send + 'static,
{
    Arc::new(PageFn { f })
}

/// A handler for one or more HTTP methods of an endpoint route.
pub trait Endpoint: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, api: ApiContext) -> BoxFuture<'static, RenderResult<Response>>;
}

struct EndpointFn<F> {
    f: F,
}

impl<F, Fut> Endpoint for EndpointFn<F>
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RenderResult<Response>> + Send + 'static,
{
    fn call(&self, api: ApiContext) -> BoxFuture<'static, RenderResult<Response>> {
        Box::pin((self.f)(api))
    }
}

/// Wraps an async closure as an endpoint handler.
pub fn endpoint_fn<F, Fut>(f: F) -> Arc<dyn Endpoint>
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RenderResult<Response>> + Send + 'static,
{
    Arc::new(EndpointFn { f })
}

/// Per-method endpoint handlers.
///
/// # Example
///
/// ```rust
/// use daedalus_core::{endpoint_fn, EndpointHandlers, Response, ResponseExt};
/// use http::{Method, StatusCode};
///
/// let handlers = EndpointHandlers::new()
///     .get(endpoint_fn(|_api| async { Ok(Response::text(StatusCode::OK, "ok")) }));
///
/// assert!(handlers.handler_for(&Method::GET).is_some());
/// assert!(handlers.handler_for(&Method::HEAD).is_some());
/// assert!(handlers.handler_for(&Method::POST).is_none());
/// ```
#[derive(Clone, Default)]
pub struct EndpointHandlers {
    get: Option<Arc<dyn Endpoint>>,
    post: Option<Arc<dyn Endpoint>>,
    put: Option<Arc<dyn Endpoint>>,
    delete: Option<Arc<dyn Endpoint>>,
    patch: Option<Arc<dyn Endpoint>>,
    head: Option<Arc<dyn Endpoint>>,
    options: Option<Arc<dyn Endpoint>>,
    all: Option<Arc<dyn Endpoint>>,
}

impl EndpointHandlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET handler.
    #[must_use]
    pub fn get(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.get = Some(handler);
        self
    }

    /// Registers a POST handler.
    #[must_use]
    pub fn post(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.post = Some(handler);
        self
    }

    /// Registers a PUT handler.
    #[must_use]
    pub fn put(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.put = Some(handler);
        self
    }

    /// Registers a DELETE handler.
    #[must_use]
    pub fn delete(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.delete = Some(handler);
        self
    }

    /// Registers a PATCH handler.
    #[must_use]
    pub fn patch(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.patch = Some(handler);
        self
    }

    /// Registers a HEAD handler.
    #[must_use]
    pub fn head(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.head = Some(handler);
        self
    }

    /// Registers an OPTIONS handler.
    #[must_use]
    pub fn options(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.options = Some(handler);
        self
    }

    /// Registers a handler for every method without its own.
    #[must_use]
    pub fn all(mut self, handler: Arc<dyn Endpoint>) -> Self {
        self.all = Some(handler);
        self
    }

    /// Registers a handler for a method. Unsupported methods are ignored.
    #[must_use]
    pub fn method(mut self, method: &Method, handler: Arc<dyn Endpoint>) -> Self {
        match *method {
            Method::GET => self.get = Some(handler),
            Method::POST => self.post = Some(handler),
            Method::PUT => self.put = Some(handler),
            Method::DELETE => self.delete = Some(handler),
            Method::PATCH => self.patch = Some(handler),
            Method::HEAD => self.head = Some(handler),
            Method::OPTIONS => self.options = Some(handler),
            _ => {}
        }
        self
    }

    fn exact(&self, method: &Method) -> Option<&Arc<dyn Endpoint>> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            _ => None,
        }
    }

    /// Returns the handler for a method.
    ///
    /// HEAD falls back to GET; any method falls back to the catch-all.
    #[must_use]
    pub fn handler_for(&self, method: &Method) -> Option<&Arc<dyn Endpoint>> {
        self.exact(method)
            .or_else(|| (*method == Method::HEAD).then(|| self.get.as_ref()).flatten())
            .or(self.all.as_ref())
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed_methods().is_empty() && self.all.is_none()
    }

    /// Returns the methods with a dedicated handler.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::HEAD,
            Method::OPTIONS,
        ]
        .into_iter()
        .filter(|method| self.exact(method).is_some())
        .collect()
    }
}

impl fmt::Debug for EndpointHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHandlers")
            .field("methods", &self.allowed_methods())
            .field("all", &self.all.is_some())
            .finish()
    }
}
