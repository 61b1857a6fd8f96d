//! Test fixtures for Daedalus development and testing.
//!
//! Pre-built requests, route sets and locale settings shared by the tests of
//! the pipeline and dispatch crates.
//!
//! # Example
//!
//! ```
//! use daedalus_core::fixtures;
//!
//! let routes = fixtures::blog_routes();
//! assert!(routes.iter().any(|r| r.route() == "/blog/[slug]"));
//! ```

use std::sync::Arc;

use bytes::Bytes;
use daedalus_router::{I18nRouting, Locale, RouteDescriptor, RouteType, RoutingStrategy};
use http::Method;

use crate::context::RenderContext;
use crate::environment::Environment;
use crate::types::Request;

/// Builds a bodyless request.
///
/// # Panics
///
/// Panics if `path` is not a valid URI.
#[must_use]
pub fn request(method: Method, path: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap_or_else(|e| panic!("invalid fixture request '{path}': {e}"))
}

/// Builds a GET request.
#[must_use]
pub fn get(path: &str) -> Request {
    request(Method::GET, path)
}

fn route(builder: daedalus_router::RouteBuilder) -> RouteDescriptor {
    builder
        .build()
        .unwrap_or_else(|e| panic!("invalid fixture route: {e}"))
}

/// A small blog site.
///
/// - `/` page
/// - `/about` page
/// - `/blog/[slug]` page
/// - `/api/posts` endpoint
/// - `/old` redirect to `/about`
/// - `/404` and `/500` error pages
/// - `/[...rest]` catch-all page
#[must_use]
pub fn blog_routes() -> Vec<RouteDescriptor> {
    vec![
        route(RouteDescriptor::builder("/").component("index.html")),
        route(RouteDescriptor::builder("/about").component("about.html")),
        route(RouteDescriptor::builder("/blog/[slug]").component("blog/[slug].html")),
        route(
            RouteDescriptor::builder("/api/posts")
                .component("api/posts.endpoint")
                .route_type(RouteType::Endpoint),
        ),
        route(
            RouteDescriptor::builder("/old")
                .route_type(RouteType::Redirect)
                .redirect_to("/about"),
        ),
        route(RouteDescriptor::builder("/404").component("404.html")),
        route(RouteDescriptor::builder("/500").component("500.html")),
        route(RouteDescriptor::builder("/[...rest]").component("[...rest].html")),
    ]
}

/// English default, Spanish and Italian, with Italian falling back to English.
#[must_use]
pub fn i18n_routing(strategy: RoutingStrategy) -> I18nRouting {
    I18nRouting::new("en")
        .locale(Locale::Code("es".to_string()))
        .locale(Locale::Code("it".to_string()))
        .strategy(strategy)
        .fallback("it", "en")
}

/// Builds a ready render context for a GET request on a route.
///
/// # Panics
///
/// Panics if the route needs an enumerated static path.
#[must_use]
pub fn render_context(path: &str, route: RouteDescriptor) -> RenderContext {
    RenderContext::builder(Arc::new(get(path)), Arc::new(route))
        .build(&Environment::default(), None)
        .and_then(crate::context::Resolution::found)
        .unwrap_or_else(|e| panic!("fixture context for '{path}' failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_routes_are_valid() {
        let routes = blog_routes();
        assert_eq!(routes.len(), 8);
        assert!(routes
            .iter()
            .any(|r| r.route_type() == RouteType::Redirect && r.redirect().is_some()));
    }

    #[test]
    fn test_render_context_fixture() {
        let ctx = render_context("/blog/post", RouteDescriptor::page("/blog/[slug]").unwrap());
        assert_eq!(ctx.params().get("slug"), Some("post"));
    }
}
