//! In-memory client over an [`App`] or a [`DevHandler`].

use std::sync::Arc;

use bytes::Bytes;
use daedalus_server::{App, DevHandler};
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

#[derive(Clone)]
enum Target {
    App(Arc<App>),
    Dev(Arc<DevHandler>),
}

/// Dispatches requests without binding a port.
///
/// Requests go through the same matching, middleware and error fallback as
/// they would behind [`Server`](daedalus_server::Server); only the static
/// layer is skipped.
///
/// # Example
///
/// ```
/// use daedalus_core::{page_fn, PageOutput};
/// use daedalus_middleware::{RenderUnit, UnitMap};
/// use daedalus_router::{RouteDescriptor, RouteTable};
/// use daedalus_server::{App, Manifest};
/// use daedalus_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let routes = RouteTable::from_routes([RouteDescriptor::page("/").unwrap()]);
/// let units = UnitMap::new().unit(
///     "/",
///     RenderUnit::page(page_fn(|_ctx, _api| async { Ok(PageOutput::from("home")) })),
/// );
/// let client = TestClient::new(App::new(Manifest::builder(routes, units).build()));
///
/// client
///     .get("/")
///     .send()
///     .await
///     .assert_status(http::StatusCode::OK)
///     .assert_body_eq("home");
/// # });
/// ```
#[must_use]
#[derive(Clone)]
pub struct TestClient {
    target: Target,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over a production app.
    pub fn new(app: App) -> Self {
        Self {
            target: Target::App(Arc::new(app)),
            default_headers: Vec::new(),
        }
    }

    /// Creates a client over a development handler.
    pub fn dev(handler: DevHandler) -> Self {
        Self {
            target: Target::Dev(Arc::new(handler)),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    /// Dispatches a built request.
    pub async fn dispatch(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let (request, options) = request.into_parts()?;
        let response = match &self.target {
            Target::App(app) => app.render(request, options).await,
            Target::Dev(dev) => dev.handle(request, options).await,
        };
        Ok(TestResponse::from_response(response).await)
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match self.target {
            Target::App(_) => "app",
            Target::Dev(_) => "dev",
        };
        f.debug_struct("TestClient")
            .field("target", &target)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Accept-Language` header.
    pub fn accept_language(mut self, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept_language(value);
        self
    }

    /// Adds a request cookie.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Seeds the request locals.
    pub fn locals(mut self, locals: serde_json::Value) -> Self {
        self.builder = self.builder.locals(locals);
        self
    }

    /// Sets the client address the host reports.
    pub fn client_address(mut self, address: impl Into<String>) -> Self {
        self.builder = self.builder.client_address(address);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built.
    pub async fn send(self) -> TestResponse {
        self.try_send()
            .await
            .unwrap_or_else(|e| panic!("test request failed: {e}"))
    }

    /// Sends the request, returning build errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.dispatch(request).await
    }
}
