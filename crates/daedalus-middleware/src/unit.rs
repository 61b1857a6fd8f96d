//! Render units and their loaders.
//!
//! A [`RenderUnit`] is what the build produced for one route: the page
//! component, the endpoint handlers, the route's own middleware and its
//! static path enumeration. Units are produced on demand by a
//! [`UnitLoader`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use daedalus_core::{BoxFuture, EndpointHandlers, Page, RenderError, RenderResult, StaticPathsFn};
use daedalus_router::RouteDescriptor;
use indexmap::IndexMap;

use crate::middleware::Middleware;

/// The loaded artifact behind one route.
#[derive(Clone, Default)]
pub struct RenderUnit {
    page: Option<Arc<dyn Page>>,
    on_request: Option<Arc<dyn Middleware>>,
    endpoint: Option<EndpointHandlers>,
    static_paths: Option<StaticPathsFn>,
}

impl RenderUnit {
    /// Creates a unit with no exports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a page unit.
    #[must_use]
    pub fn page(page: Arc<dyn Page>) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Creates an endpoint unit.
    #[must_use]
    pub fn endpoint(handlers: EndpointHandlers) -> Self {
        Self {
            endpoint: Some(handlers),
            ..Self::default()
        }
    }

    /// Attaches the unit's own middleware.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.on_request = Some(middleware);
        self
    }

    /// Attaches a static path enumeration.
    #[must_use]
    pub fn with_static_paths(mut self, static_paths: StaticPathsFn) -> Self {
        self.static_paths = Some(static_paths);
        self
    }

    /// Returns the page component.
    #[must_use]
    pub fn page_component(&self) -> Option<&Arc<dyn Page>> {
        self.page.as_ref()
    }

    /// Returns the unit's middleware.
    #[must_use]
    pub fn on_request(&self) -> Option<&Arc<dyn Middleware>> {
        self.on_request.as_ref()
    }

    /// Returns the endpoint handlers.
    #[must_use]
    pub fn endpoint_handlers(&self) -> Option<&EndpointHandlers> {
        self.endpoint.as_ref()
    }

    /// Returns the static path enumeration.
    #[must_use]
    pub fn static_paths(&self) -> Option<&StaticPathsFn> {
        self.static_paths.as_ref()
    }
}

impl fmt::Debug for RenderUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderUnit")
            .field("page", &self.page.is_some())
            .field("on_request", &self.on_request.as_ref().map(|m| m.name()))
            .field("endpoint", &self.endpoint)
            .field("static_paths", &self.static_paths.is_some())
            .finish()
    }
}

/// The built-in unit used for redirect routes.
#[must_use]
pub fn redirect_unit() -> Arc<RenderUnit> {
    static UNIT: OnceLock<Arc<RenderUnit>> = OnceLock::new();
    Arc::clone(UNIT.get_or_init(|| Arc::new(RenderUnit::new())))
}

/// Produces the render unit for a route.
pub trait UnitLoader: Send + Sync + 'static {
    /// Loads the unit.
    fn load<'a>(&'a self, route: &'a RouteDescriptor) -> BoxFuture<'a, RenderResult<Arc<RenderUnit>>>;
}

/// Units keyed by component identifier.
#[derive(Debug, Clone, Default)]
pub struct UnitMap {
    units: IndexMap<String, Arc<RenderUnit>>,
}

impl UnitMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit for a component.
    #[must_use]
    pub fn unit(mut self, component: impl Into<String>, unit: RenderUnit) -> Self {
        self.units.insert(component.into(), Arc::new(unit));
        self
    }

    /// Looks up a unit without going through the loader.
    #[must_use]
    pub fn get(&self, component: &str) -> Option<&Arc<RenderUnit>> {
        self.units.get(component)
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl UnitLoader for UnitMap {
    fn load<'a>(&'a self, route: &'a RouteDescriptor) -> BoxFuture<'a, RenderResult<Arc<RenderUnit>>> {
        Box::pin(async move {
            self.get(route.component())
                .cloned()
                .ok_or_else(|| RenderError::UnitNotFound {
                    component: route.component().to_string(),
                })
        })
    }
}

/// Serves the same unit for every route, as in single-page builds.
#[derive(Debug, Clone)]
pub struct SingleUnitLoader {
    unit: Arc<RenderUnit>,
}

impl SingleUnitLoader {
    /// Creates a loader for one unit.
    #[must_use]
    pub fn new(unit: RenderUnit) -> Self {
        Self {
            unit: Arc::new(unit),
        }
    }
}

impl UnitLoader for SingleUnitLoader {
    fn load<'a>(&'a self, _route: &'a RouteDescriptor) -> BoxFuture<'a, RenderResult<Arc<RenderUnit>>> {
        Box::pin(async move { Ok(Arc::clone(&self.unit)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{page_fn, PageOutput};

    fn home() -> RenderUnit {
        RenderUnit::page(page_fn(|_ctx, _api| async { Ok(PageOutput::from("home")) }))
    }

    #[tokio::test]
    async fn test_unit_map_lookup() {
        let map = UnitMap::new().unit("index.html", home());
        let route = RouteDescriptor::builder("/").component("index.html").build().unwrap();
        let unit = map.load(&route).await.unwrap();
        assert!(unit.page_component().is_some());
        assert!(unit.endpoint_handlers().is_none());
    }

    #[tokio::test]
    async fn test_unit_map_missing_component() {
        let map = UnitMap::new();
        let route = RouteDescriptor::page("/about").unwrap();
        match map.load(&route).await {
            Err(RenderError::UnitNotFound { component }) => assert_eq!(component, "/about"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_unit_loader() {
        let loader = SingleUnitLoader::new(home());
        let a = loader.load(&RouteDescriptor::page("/a").unwrap()).await.unwrap();
        let b = loader.load(&RouteDescriptor::page("/b").unwrap()).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_redirect_unit_is_shared_and_empty() {
        let unit = redirect_unit();
        assert!(Arc::ptr_eq(&unit, &redirect_unit()));
        assert!(unit.page_component().is_none());
    }
}
