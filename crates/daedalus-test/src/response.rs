//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use daedalus_core::{body_bytes, Response};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A fully buffered response with assertion helpers.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers a dispatched response.
    pub async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body_bytes(body).await,
        }
    }

    /// Creates a response from raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Location` header.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// Returns every `Set-Cookie` header, in order.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "expected status {expected}, got {} with body: {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("header '{name}' not found"));
        assert_eq!(actual, expected, "header '{name}'");
        self
    }

    /// Asserts a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(
            self.header(name).is_none(),
            "header '{name}' should be absent, got {:?}",
            self.header(name)
        );
        self
    }

    /// Asserts a redirect to `location` with the given status.
    ///
    /// # Panics
    ///
    /// Panics if the response is not that redirect.
    pub fn assert_redirect(&self, status: StatusCode, location: impl AsRef<str>) -> &Self {
        self.assert_status(status);
        self.assert_header(header::LOCATION.as_str(), location)
    }

    /// Asserts the body contains a substring.
    ///
    /// # Panics
    ///
    /// Panics if the body is not UTF-8 or lacks the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = self.text().unwrap_or_else(|e| panic!("{e}"));
        assert!(
            body.contains(expected),
            "body should contain '{expected}', got: {body}"
        );
        self
    }

    /// Asserts the body equals a string.
    ///
    /// # Panics
    ///
    /// Panics if the body differs.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = self.text().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(body, expected.as_ref(), "body mismatch");
        self
    }

    /// Asserts the body is empty.
    ///
    /// # Panics
    ///
    /// Panics if the body has content.
    pub fn assert_empty_body(&self) -> &Self {
        assert!(
            self.body.is_empty(),
            "body should be empty, got {} bytes",
            self.body.len()
        );
        self
    }

    /// Asserts a JSON field, addressed by a dotted path such as `items.0.id`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or the field differs.
    pub fn assert_json_field(&self, path: &str, expected: &serde_json::Value) -> &Self {
        let json: serde_json::Value = self.json().unwrap_or_else(|e| panic!("{e}"));
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}
