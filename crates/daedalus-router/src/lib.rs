//! File-based route matching for Daedalus.
//!
//! Routes are written the way pages are laid out on disk:
//!
//! - **Static segments**: `/about/team`
//! - **Dynamic segments**: `/blog/[slug]`, also mixed with text: `/[lang]-[id].json`
//! - **Rest segments**: `/docs/[...path]`, matching zero or more segments
//!
//! Each route is compiled once into a [`RouteDescriptor`] and collected into
//! an immutable [`RouteTable`]. Matching never mutates the table and is safe
//! to call from any number of threads.
//!
//! # Example
//!
//! ```rust
//! use daedalus_router::{RouteDescriptor, RouteTable};
//!
//! let table = RouteTable::from_routes([
//!     RouteDescriptor::page("/blog/[slug]").unwrap(),
//!     RouteDescriptor::page("/blog/latest").unwrap(),
//!     RouteDescriptor::page("/[...path]").unwrap(),
//! ]);
//!
//! // Most specific first
//! let matched = table.match_all("/blog/latest");
//! assert_eq!(matched[0].route(), "/blog/latest");
//! assert_eq!(matched[1].route(), "/blog/[slug]");
//! assert_eq!(matched[2].route(), "/[...path]");
//!
//! let route = table.match_one("/blog/hello").unwrap();
//! let params = route.params_for("/blog/hello").unwrap();
//! assert_eq!(params.get("slug"), Some("hello"));
//! ```
//!
//! # Locales
//!
//! With [`I18nRouting`] fallbacks configured, the table attaches synthesized
//! fallback routes (`/es/about` for a missing Spanish page) to the route
//! they fall back to. [`RouteTable::match_one`] considers them;
//! [`RouteTable::match_all`] does not.

mod error;
mod i18n;
mod matcher;
mod params;
mod route;
mod scan;
mod segment;
mod table;

pub use error::RouteError;
pub use i18n::{attach_fallback_routes, I18nRouting, Locale, RoutingStrategy};
pub use matcher::{match_all, match_one, normalize_pathname};
pub use params::Params;
pub use route::{RedirectTarget, RouteBuilder, RouteDescriptor, RouteType};
pub use scan::{scan_pages, ENDPOINT_EXTENSIONS, PAGE_EXTENSIONS};
pub use segment::{encode_param, parse_route, RoutePart, Segment, TrailingSlash};
pub use table::{RouteTable, RouteTableBuilder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_matching() {
        let table = RouteTable::from_routes([
            RouteDescriptor::page("/").unwrap(),
            RouteDescriptor::page("/users/[id]").unwrap(),
        ]);

        assert_eq!(table.match_one("/").unwrap().route(), "/");
        let route = table.match_one("/users/123").unwrap();
        assert_eq!(route.params_for("/users/123").unwrap().get("id"), Some("123"));
        assert!(table.match_one("/posts").is_none());
    }

    #[test]
    fn test_static_vs_param_priority() {
        let table = RouteTable::from_routes([
            RouteDescriptor::page("/users/[id]").unwrap(),
            RouteDescriptor::page("/users/me").unwrap(),
        ]);

        assert_eq!(table.match_one("/users/me").unwrap().route(), "/users/me");
        assert_eq!(table.match_one("/users/42").unwrap().route(), "/users/[id]");
    }

    #[test]
    fn test_rest_routing() {
        let table = RouteTable::from_routes([RouteDescriptor::page("/files/[...path]").unwrap()]);
        let route = table.match_one("/files/images/logo.png").unwrap();
        let params = route.params_for("/files/images/logo.png").unwrap();
        assert_eq!(params.get("path"), Some("images/logo.png"));
    }
}
