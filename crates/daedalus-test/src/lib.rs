//! # Daedalus Test
//!
//! In-memory testing for Daedalus sites. Requests are dispatched straight to
//! an [`App`](daedalus_server::App) or a
//! [`DevHandler`](daedalus_server::DevHandler), so tests exercise route
//! matching, middleware and error page fallback without binding a port.
//!
//! ## Example
//!
//! ```ignore
//! use daedalus_test::TestClient;
//!
//! #[tokio::test]
//! async fn test_missing_page() {
//!     let client = TestClient::new(build_app());
//!
//!     client
//!         .get("/missing")
//!         .send()
//!         .await
//!         .assert_status(http::StatusCode::NOT_FOUND)
//!         .assert_body_contains("Not Found");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
