//! Test request building.

use bytes::Bytes;
use daedalus_core::Request;
use daedalus_server::RenderOptions;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::error::TestError;

/// A request ready to be dispatched, with the values the host would pass
/// alongside it.
#[derive(Debug)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
    /// Locals seeded by the host
    pub locals: Option<serde_json::Value>,
    /// Client address reported by the host
    pub client_address: Option<String>,
}

impl TestRequest {
    /// Starts a GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Starts a HEAD request.
    pub fn head(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::HEAD, uri)
    }

    /// Splits into the buffered request and its render options.
    pub fn into_parts(self) -> Result<(Request, RenderOptions), TestError> {
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;
        *request.headers_mut() = self.headers;

        let mut options = RenderOptions::new();
        if let Some(locals) = self.locals {
            options = options.locals(locals);
        }
        if let Some(address) = self.client_address {
            options = options.client_address(address);
        }
        Ok((request, options))
    }
}

/// Builder for [`TestRequest`].
///
/// Invalid headers are remembered and reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    locals: Option<serde_json::Value>,
    client_address: Option<String>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            locals: None,
            client_address: None,
            error: None,
        }
    }

    /// Appends a header.
    ///
    /// ```
    /// use daedalus_test::TestRequest;
    ///
    /// let request = TestRequest::get("/")
    ///     .header("accept-language", "es")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["accept-language"], "es");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let parsed = HeaderName::try_from(name)
            .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            .and_then(|header_name| {
                HeaderValue::try_from(value.as_ref())
                    .map(|v| (header_name, v))
                    .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Accept-Language` header.
    pub fn accept_language(self, value: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT_LANGUAGE.as_str(), value)
    }

    /// Adds a request cookie. The value is sent as given.
    pub fn cookie(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let pair = format!("{}={}", name.as_ref(), value.as_ref());
        self.header(header::COOKIE.as_str(), pair)
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => {
                self.error.get_or_insert(TestError::Json(e));
            }
        }
        self.content_type("application/json")
    }

    /// Sets a form-urlencoded body from string pairs.
    pub fn form<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let encoded = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(Bytes::from(encoded));
        self.content_type("application/x-www-form-urlencoded")
    }

    /// Seeds the request locals.
    pub fn locals(mut self, locals: serde_json::Value) -> Self {
        self.locals = Some(locals);
        self
    }

    /// Sets the client address the host reports.
    pub fn client_address(mut self, address: impl Into<String>) -> Self {
        self.client_address = Some(address.into());
        self
    }

    /// Builds the request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI '{}': {e}", self.uri)))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
            locals: self.locals,
            client_address: self.client_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/blog/first?draft=1").build().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.uri.path(), "/blog/first");
        assert_eq!(request.uri.query(), Some("draft=1"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_invalid_header_is_reported_on_build() {
        let result = TestRequest::get("/").header("bad header", "x").build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_uri() {
        let result = TestRequest::get("http://[::1").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }

    #[test]
    fn test_cookies_are_appended() {
        let request = TestRequest::get("/")
            .cookie("theme", "dark")
            .cookie("session", "abc123")
            .build()
            .unwrap();
        let cookies: Vec<_> = request.headers.get_all(header::COOKIE).iter().collect();
        assert_eq!(cookies, ["theme=dark", "session=abc123"]);
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/api/posts")
            .json(&json!({"title": "Hello"}))
            .build()
            .unwrap();
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.body.as_ref(), b"{\"title\":\"Hello\"}");
    }

    #[test]
    fn test_form_body() {
        let request = TestRequest::post("/subscribe")
            .form([("email", "a@b.c"), ("list", "news & updates")])
            .build()
            .unwrap();
        assert_eq!(
            request.body.as_ref(),
            b"email=a%40b.c&list=news%20%26%20updates"
        );
    }

    #[test]
    fn test_into_parts_carries_options() {
        let (request, _options) = TestRequest::get("/")
            .accept_language("es")
            .locals(json!({"user": "ada"}))
            .client_address("10.0.0.1")
            .build()
            .unwrap()
            .into_parts()
            .unwrap();
        assert_eq!(request.uri().path(), "/");
        assert_eq!(request.headers()[header::ACCEPT_LANGUAGE], "es");
    }
}
