//! HTTP types shared by every layer of the render pipeline.
//!
//! Request bodies are fully buffered before rendering starts. Response
//! bodies are boxed so pages can either return a fixed buffer or stream.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Empty, Full};

/// A boxed future, as returned by pages, endpoints and middleware.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed response body.
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, Infallible>;

/// The request type seen by the render pipeline.
pub type Request = http::Request<Bytes>;

/// The response type produced by the render pipeline.
pub type Response = http::Response<BoxBody>;

/// Response header set by endpoints to signal that no endpoint handled the request.
pub const RESPONSE_MARKER_HEADER: &str = "x-daedalus-response";

/// Value of [`RESPONSE_MARKER_HEADER`] meaning "no endpoint existed".
pub const NOT_FOUND_MARKER: &str = "Not-Found";

/// Response header that stops the dispatch shell from re-rendering 404/500 responses.
pub const REROUTE_HEADER: &str = "x-daedalus-reroute";

/// Wraps bytes into a boxed body.
#[must_use]
pub fn full(body: impl Into<Bytes>) -> BoxBody {
    Full::new(body.into()).map_err(|never| match never {}).boxed()
}

/// Returns an empty boxed body.
#[must_use]
pub fn empty() -> BoxBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Convenience constructors for [`Response`].
pub trait ResponseExt: Sized {
    /// A bodyless response with the given status.
    fn with_status(status: StatusCode) -> Self;

    /// A `200 OK` HTML response.
    fn html(body: impl Into<Bytes>) -> Self;

    /// A plain text response with the given status.
    fn text(status: StatusCode, body: impl Into<Bytes>) -> Self;

    /// A redirect to `location`.
    fn redirect(location: &str, status: StatusCode) -> Self;

    /// Returns true if the response asks the shell not to re-render it.
    fn skips_reroute(&self) -> bool;
}

impl ResponseExt for Response {
    fn with_status(status: StatusCode) -> Self {
        let mut response = http::Response::new(empty());
        *response.status_mut() = status;
        response
    }

    fn html(body: impl Into<Bytes>) -> Self {
        let mut response = http::Response::new(full(body));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }

    fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut response = http::Response::new(full(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn redirect(location: &str, status: StatusCode) -> Self {
        let mut response = Self::with_status(status);
        let value = HeaderValue::from_str(location)
            .or_else(|_| HeaderValue::from_maybe_shared(escape_location(location)))
            .unwrap_or_else(|_| HeaderValue::from_static("/"));
        response.headers_mut().insert(header::LOCATION, value);
        response
    }

    fn skips_reroute(&self) -> bool {
        self.headers()
            .get(REROUTE_HEADER)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"no"))
    }
}

/// Percent-escapes bytes that cannot appear in a header value.
fn escape_location(location: &str) -> Bytes {
    let mut escaped = String::with_capacity(location.len());
    for byte in location.bytes() {
        if byte.is_ascii_graphic() {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    Bytes::from(escaped)
}

/// Collects a response body into bytes.
pub async fn body_bytes(body: BoxBody) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_html_response() {
        let response = Response::html("<h1>hi</h1>");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = body_bytes(response.into_body()).await;
        assert_eq!(&body[..], b"<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_with_status_is_bodyless() {
        let response = Response::with_status(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response.into_body()).await.is_empty());
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = Response::redirect("/new", StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/new");
    }

    #[test]
    fn test_redirect_escapes_invalid_location() {
        let response = Response::redirect("/new/a\nb c", StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/new/a%0Ab%20c");
    }

    #[test]
    fn test_skips_reroute() {
        let mut response = Response::with_status(StatusCode::NOT_FOUND);
        assert!(!response.skips_reroute());
        response
            .headers_mut()
            .insert(REROUTE_HEADER, HeaderValue::from_static("no"));
        assert!(response.skips_reroute());
    }
}
