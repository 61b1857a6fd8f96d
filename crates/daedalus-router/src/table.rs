//! The route table.

use std::sync::Arc;

use crate::error::RouteError;
use crate::i18n::{attach_fallback_routes, I18nRouting};
use crate::matcher::{match_all, match_one};
use crate::route::RouteDescriptor;

/// An ordered, immutable collection of routes.
///
/// Declaration order is preserved and used as the final tie-break when
/// matching. The table is cheap to clone and safe to share across threads.
///
/// # Example
///
/// ```rust
/// use daedalus_router::{RouteDescriptor, RouteTable};
///
/// let table = RouteTable::builder()
///     .route(RouteDescriptor::page("/").unwrap())
///     .route(RouteDescriptor::page("/blog/[slug]").unwrap())
///     .build()
///     .unwrap();
///
/// let matched = table.match_one("/blog/hello").unwrap();
/// assert_eq!(matched.route(), "/blog/[slug]");
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Arc<[Arc<RouteDescriptor>]>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            routes: Arc::from(Vec::new()),
        }
    }
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a table.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Creates a table from already compiled routes.
    #[must_use]
    pub fn from_routes(routes: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Returns every route in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.routes
    }

    /// Returns every route matching the pathname, most specific first.
    #[must_use]
    pub fn match_all(&self, pathname: &str) -> Vec<&Arc<RouteDescriptor>> {
        match_all(pathname, &self.routes)
    }

    /// Returns the most specific route matching the pathname or one of its fallbacks.
    #[must_use]
    pub fn match_one(&self, pathname: &str) -> Option<&Arc<RouteDescriptor>> {
        match_one(pathname, &self.routes)
    }

    /// Finds a route by its pattern string.
    #[must_use]
    pub fn find(&self, route: &str) -> Option<&Arc<RouteDescriptor>> {
        self.routes.iter().find(|r| r.route() == route)
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder for [`RouteTable`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<RouteDescriptor>,
    i18n: Option<I18nRouting>,
}

impl RouteTableBuilder {
    /// Appends a route.
    #[must_use]
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    /// Appends several routes.
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Enables locale fallback route synthesis.
    #[must_use]
    pub fn i18n(mut self, i18n: I18nRouting) -> Self {
        self.i18n = Some(i18n);
        self
    }

    /// Builds the table.
    pub fn build(self) -> Result<RouteTable, RouteError> {
        let routes = match &self.i18n {
            Some(i18n) => attach_fallback_routes(self.routes, i18n)?,
            None => self.routes,
        };
        Ok(RouteTable::from_routes(routes))
    }
}
