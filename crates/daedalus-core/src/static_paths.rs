//! Static path enumeration and resolution.
//!
//! Dynamic routes rendered at build time (or served by a static-output dev
//! server) must enumerate the parameter sets they support. Resolving a
//! request against that list yields a [`StaticPathResult`]; a miss is an
//! ordinary value, not an error, so callers can move on to the next
//! candidate route.

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_router::{Params, RouteDescriptor, RouteType};
use dashmap::DashMap;

use crate::environment::Environment;
use crate::error::RenderResult;

/// Props handed to a page alongside its params.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// One enumerated parameter set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticPath {
    /// Parameter values.
    pub params: Params,
    /// Props for this path.
    pub props: Props,
}

impl StaticPath {
    /// Creates a static path without props.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            params,
            props: Props::new(),
        }
    }

    /// Adds a prop.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// A unit's static path enumeration.
pub type StaticPathsFn = Arc<dyn Fn(&RouteDescriptor) -> RenderResult<Vec<StaticPath>> + Send + Sync>;

/// Outcome of resolving a pathname against a route.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticPathResult {
    /// Params (and props, for enumerated paths) were resolved.
    Resolved {
        /// Resolved params.
        params: Params,
        /// Props of the matching static path.
        props: Props,
    },
    /// The route requires an enumerated path and none matched.
    NoMatchingStaticPath,
}

/// Enumerated static paths of one route, keyed by their params.
#[derive(Debug, Default)]
pub struct KeyedStaticPaths {
    keyed: HashMap<String, StaticPath>,
}

impl KeyedStaticPaths {
    fn new(route: &RouteDescriptor, paths: Vec<StaticPath>) -> Self {
        let keyed = paths
            .into_iter()
            .map(|path| (params_key(route, &path.params), path))
            .collect();
        Self { keyed }
    }

    /// Finds the static path with the given params.
    #[must_use]
    pub fn find(&self, route: &RouteDescriptor, params: &Params) -> Option<&StaticPath> {
        self.keyed.get(&params_key(route, params))
    }

    /// Returns the number of enumerated paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keyed.len()
    }

    /// Returns true if nothing was enumerated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty()
    }
}

/// Stable key for a param set: declared names in route order.
fn params_key(route: &RouteDescriptor, params: &Params) -> String {
    route
        .param_names()
        .iter()
        .map(|name| {
            let value = params.get(name).unwrap_or_default();
            format!("{name}={}", value.trim_matches('/'))
        })
        .collect::<Vec<_>>()
        .join("\u{0}")
}

/// Per-process cache of enumerated static paths, keyed by route pattern.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    entries: Arc<DashMap<String, Arc<KeyedStaticPaths>>>,
}

impl RouteCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached paths for a route, enumerating them on first use.
    pub fn get_or_enumerate(
        &self,
        route: &RouteDescriptor,
        enumerate: &StaticPathsFn,
    ) -> RenderResult<Arc<KeyedStaticPaths>> {
        if let Some(cached) = self.entries.get(route.route()) {
            return Ok(Arc::clone(cached.value()));
        }
        let paths = enumerate(route)?;
        tracing::debug!(route = %route.route(), count = paths.len(), "enumerated static paths");
        let keyed = Arc::new(KeyedStaticPaths::new(route, paths));
        self.entries
            .insert(route.route().to_string(), Arc::clone(&keyed));
        Ok(keyed)
    }

    /// Drops every cached entry, e.g. after the pages directory changed.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of cached routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a pathname's params and props for a route.
///
/// - Routes with a concrete pathname, redirects and fallbacks resolve
///   without consulting any enumeration.
/// - On-demand routes (`ssr` and not prerendered) resolve from the pathname.
/// - Everything else must find its params in the unit's enumeration.
pub fn resolve_static_path(
    route: &RouteDescriptor,
    pathname: &str,
    static_paths: Option<&StaticPathsFn>,
    env: &Environment,
) -> RenderResult<StaticPathResult> {
    let params = route.params_for(pathname).unwrap_or_default();

    let skip = route.pathname().is_some()
        || matches!(route.route_type(), RouteType::Redirect | RouteType::Fallback)
        || (route.route_type() == RouteType::Endpoint && static_paths.is_none())
        || (env.ssr() && !route.is_prerendered());
    if skip {
        return Ok(StaticPathResult::Resolved {
            params,
            props: Props::new(),
        });
    }

    let Some(enumerate) = static_paths else {
        return Ok(StaticPathResult::NoMatchingStaticPath);
    };
    let keyed = env.route_cache().get_or_enumerate(route, enumerate)?;
    Ok(match keyed.find(route, &params) {
        Some(found) => StaticPathResult::Resolved {
            params,
            props: found.props.clone(),
        },
        None => StaticPathResult::NoMatchingStaticPath,
    })
}
