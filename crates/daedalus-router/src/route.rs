//! Route descriptors.
//!
//! A [`RouteDescriptor`] is compiled once, when the route table is built or
//! a pages directory is scanned, and is shared read-only by every request
//! afterwards.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouteError;
use crate::params::Params;
use crate::segment::{compile_pattern, generate_path, parse_route, Segment, TrailingSlash};

/// What a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteType {
    /// A page component rendered to HTML.
    Page,
    /// An endpoint producing a raw response.
    Endpoint,
    /// A redirect to another path or route.
    Redirect,
    /// A locale fallback placeholder; always renders as 404 on its own.
    Fallback,
}

impl RouteType {
    /// Returns the lowercase name of the route type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Endpoint => "endpoint",
            Self::Redirect => "redirect",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of a redirect route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Destination template, e.g. `/posts/[slug]` or an absolute URL.
    pub destination: String,
    /// Explicit status; when absent the method decides (301 or 308).
    pub status: Option<u16>,
}

impl RedirectTarget {
    /// Returns true if the destination points at another origin.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.destination.starts_with("http://") || self.destination.starts_with("https://")
    }
}

/// A compiled route.
///
/// # Example
///
/// ```rust
/// use daedalus_router::RouteDescriptor;
///
/// let route = RouteDescriptor::builder("/blog/[slug]")
///     .component("src/pages/blog/[slug].html")
///     .build()
///     .unwrap();
///
/// assert!(route.matches("/blog/hello"));
/// let params = route.params_for("/blog/hello").unwrap();
/// assert_eq!(params.get("slug"), Some("hello"));
/// assert_eq!(route.generate(&params), "/blog/hello");
/// ```
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    route: String,
    component: String,
    route_type: RouteType,
    segments: Vec<Segment>,
    params: Vec<String>,
    pattern: Regex,
    pathname: Option<String>,
    prerender: bool,
    trailing_slash: TrailingSlash,
    fallback_routes: Vec<Arc<RouteDescriptor>>,
    redirect: Option<RedirectTarget>,
    redirect_route: Option<Arc<RouteDescriptor>>,
}

impl RouteDescriptor {
    /// Starts building a route from its pattern string.
    #[must_use]
    pub fn builder(route: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(route)
    }

    /// Shorthand for a page route with default settings.
    pub fn page(route: &str) -> Result<Self, RouteError> {
        Self::builder(route).build()
    }

    /// Shorthand for an endpoint route with default settings.
    pub fn endpoint(route: &str) -> Result<Self, RouteError> {
        Self::builder(route).route_type(RouteType::Endpoint).build()
    }

    /// Returns the route pattern string, e.g. `/blog/[slug]`.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the component identifier used to load the render unit.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns the route type.
    #[must_use]
    pub fn route_type(&self) -> RouteType {
        self.route_type
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Returns the compiled matcher.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Returns the concrete pathname for routes without parameters.
    #[must_use]
    pub fn pathname(&self) -> Option<&str> {
        self.pathname.as_deref()
    }

    /// Returns true if the route was rendered at build time.
    #[must_use]
    pub fn is_prerendered(&self) -> bool {
        self.prerender
    }

    /// Returns the trailing slash policy the pattern was compiled with.
    #[must_use]
    pub fn trailing_slash(&self) -> TrailingSlash {
        self.trailing_slash
    }

    /// Returns the locale fallback routes attached to this route.
    #[must_use]
    pub fn fallback_routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.fallback_routes
    }

    /// Returns the redirect destination, for redirect routes.
    #[must_use]
    pub fn redirect(&self) -> Option<&RedirectTarget> {
        self.redirect.as_ref()
    }

    /// Returns the route a redirect points at, when it targets another route.
    #[must_use]
    pub fn redirect_route(&self) -> Option<&Arc<RouteDescriptor>> {
        self.redirect_route.as_ref()
    }

    /// Returns true if any segment holds a parameter.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.segments.iter().flatten().any(|p| p.dynamic)
    }

    /// Returns true if the route has a rest parameter.
    #[must_use]
    pub fn has_rest(&self) -> bool {
        self.segments.iter().flatten().any(|p| p.spread)
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Tests the route's own pattern against a pathname.
    #[must_use]
    pub fn matches(&self, pathname: &str) -> bool {
        self.pattern.is_match(pathname)
    }

    /// Tests the route's pattern, then each attached fallback route.
    #[must_use]
    pub fn matches_with_fallbacks(&self, pathname: &str) -> bool {
        self.matches(pathname) || self.matches_fallback(pathname)
    }

    /// Returns true if one of the fallback routes matches the pathname.
    #[must_use]
    pub fn matches_fallback(&self, pathname: &str) -> bool {
        self.fallback_routes.iter().any(|r| r.matches(pathname))
    }

    /// Extracts parameters from a pathname matching this route.
    ///
    /// Values are percent-decoded. A rest parameter that consumed nothing
    /// is recorded as unset. Returns `None` if the pattern does not match.
    #[must_use]
    pub fn params_for(&self, pathname: &str) -> Option<Params> {
        let captures = self.pattern.captures(pathname)?;
        let mut params = Params::with_capacity(self.params.len());

        for (i, name) in self.params.iter().enumerate() {
            match captures.get(i + 1).map(|m| m.as_str()) {
                Some(raw) if !raw.is_empty() => {
                    let value = urlencoding::decode(raw)
                        .map(std::borrow::Cow::into_owned)
                        .unwrap_or_else(|_| raw.to_string());
                    params.push(name.clone(), value);
                }
                Some(raw) if !self.is_spread(name) => params.push(name.clone(), raw),
                _ => params.push_unset(name.clone()),
            }
        }

        Some(params)
    }

    fn is_spread(&self, name: &str) -> bool {
        self.segments
            .iter()
            .flatten()
            .any(|p| p.spread && p.content == name)
    }

    /// Builds a path for this route from parameter values.
    #[must_use]
    pub fn generate(&self, params: &Params) -> String {
        generate_path(&self.segments, params, self.trailing_slash)
    }

    /// Returns a copy of this route re-targeted at another pattern and type.
    ///
    /// Used when synthesizing locale fallback routes.
    pub fn derive(&self, route: &str, route_type: RouteType) -> Result<Self, RouteError> {
        RouteBuilder::new(route)
            .component(self.component.clone())
            .route_type(route_type)
            .prerender(self.prerender)
            .trailing_slash(self.trailing_slash)
            .build()
    }

    pub(crate) fn push_fallback(&mut self, route: Arc<RouteDescriptor>) {
        self.fallback_routes.push(route);
    }
}

impl PartialEq for RouteDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.route == other.route
            && self.component == other.component
            && self.route_type == other.route_type
            && self.prerender == other.prerender
    }
}

/// Builder for [`RouteDescriptor`].
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    route: String,
    component: Option<String>,
    route_type: RouteType,
    prerender: bool,
    trailing_slash: TrailingSlash,
    fallback_routes: Vec<Arc<RouteDescriptor>>,
    redirect: Option<RedirectTarget>,
    redirect_route: Option<Arc<RouteDescriptor>>,
}

impl RouteBuilder {
    fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            component: None,
            route_type: RouteType::Page,
            prerender: false,
            trailing_slash: TrailingSlash::default(),
            fallback_routes: Vec::new(),
            redirect: None,
            redirect_route: None,
        }
    }

    /// Sets the component identifier. Defaults to the route string.
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Sets the route type. Defaults to [`RouteType::Page`].
    #[must_use]
    pub fn route_type(mut self, route_type: RouteType) -> Self {
        self.route_type = route_type;
        self
    }

    /// Marks the route as rendered at build time.
    #[must_use]
    pub fn prerender(mut self, prerender: bool) -> Self {
        self.prerender = prerender;
        self
    }

    /// Sets the trailing slash policy.
    #[must_use]
    pub fn trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    /// Makes this a redirect route pointing at a destination template.
    #[must_use]
    pub fn redirect_to(mut self, destination: impl Into<String>) -> Self {
        self.route_type = RouteType::Redirect;
        self.redirect = Some(RedirectTarget {
            destination: destination.into(),
            status: self.redirect.and_then(|r| r.status),
        });
        self
    }

    /// Sets an explicit redirect status.
    #[must_use]
    pub fn redirect_status(mut self, status: u16) -> Self {
        let destination = self
            .redirect
            .map(|r| r.destination)
            .unwrap_or_default();
        self.redirect = Some(RedirectTarget {
            destination,
            status: Some(status),
        });
        self
    }

    /// Makes this a redirect route targeting another route.
    #[must_use]
    pub fn redirect_route(mut self, target: Arc<RouteDescriptor>) -> Self {
        self.route_type = RouteType::Redirect;
        if self.redirect.is_none() {
            self.redirect = Some(RedirectTarget {
                destination: target.route().to_string(),
                status: None,
            });
        }
        self.redirect_route = Some(target);
        self
    }

    /// Attaches a locale fallback route.
    #[must_use]
    pub fn fallback_route(mut self, route: Arc<RouteDescriptor>) -> Self {
        self.fallback_routes.push(route);
        self
    }

    /// Parses and compiles the route.
    pub fn build(self) -> Result<RouteDescriptor, RouteError> {
        if !self.route.starts_with('/') {
            return Err(RouteError::invalid(&self.route, "route must start with '/'"));
        }
        if let Some(status) = self.redirect.as_ref().and_then(|r| r.status) {
            if !(300..400).contains(&status) {
                return Err(RouteError::InvalidRedirectStatus {
                    route: self.route,
                    status,
                });
            }
        }
        let segments = parse_route(&self.route)?;
        let pattern = compile_pattern(&self.route, &segments, self.trailing_slash)?;
        let params: Vec<String> = segments
            .iter()
            .flatten()
            .filter(|p| p.dynamic)
            .map(|p| p.content.clone())
            .collect();
        let pathname = params
            .is_empty()
            .then(|| generate_path(&segments, &Params::new(), self.trailing_slash));

        Ok(RouteDescriptor {
            component: self.component.unwrap_or_else(|| self.route.clone()),
            route: self.route,
            route_type: self.route_type,
            segments,
            params,
            pattern,
            pathname,
            prerender: self.prerender,
            trailing_slash: self.trailing_slash,
            fallback_routes: self.fallback_routes,
            redirect: self.redirect,
            redirect_route: self.redirect_route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_route() {
        let route = RouteDescriptor::page("/about").unwrap();
        assert_eq!(route.route(), "/about");
        assert_eq!(route.component(), "/about");
        assert_eq!(route.route_type(), RouteType::Page);
        assert_eq!(route.pathname(), Some("/about"));
        assert!(!route.is_dynamic());
        assert!(route.matches("/about"));
        assert!(!route.matches("/about/us"));
    }

    #[test]
    fn test_route_must_be_absolute() {
        assert!(RouteDescriptor::page("about").is_err());
    }

    #[test]
    fn test_dynamic_params() {
        let route = RouteDescriptor::page("/blog/[slug]").unwrap();
        assert!(route.is_dynamic());
        assert!(route.pathname().is_none());
        assert_eq!(route.param_names(), ["slug".to_string()]);

        let params = route.params_for("/blog/hello%20world").unwrap();
        assert_eq!(params.get("slug"), Some("hello world"));
        assert!(route.params_for("/blog").is_none());
    }

    #[test]
    fn test_rest_params_unset_when_empty() {
        let route = RouteDescriptor::page("/docs/[...path]").unwrap();
        assert!(route.has_rest());

        let params = route.params_for("/docs").unwrap();
        assert!(params.is_unset("path"));

        let params = route.params_for("/docs/guide/intro").unwrap();
        assert_eq!(params.get("path"), Some("guide/intro"));
    }

    #[test]
    fn test_generate_round_trip() {
        let route = RouteDescriptor::page("/[lang]/posts/[id]").unwrap();
        let params = route.params_for("/fr/posts/42").unwrap();
        assert_eq!(route.generate(&params), "/fr/posts/42");
    }

    #[test]
    fn test_redirect_builder() {
        let route = RouteDescriptor::builder("/old/[slug]")
            .redirect_to("/posts/[slug]")
            .redirect_status(302)
            .build()
            .unwrap();
        assert_eq!(route.route_type(), RouteType::Redirect);
        let target = route.redirect().unwrap();
        assert_eq!(target.destination, "/posts/[slug]");
        assert_eq!(target.status, Some(302));
        assert!(!target.is_external());
    }

    #[test]
    fn test_redirect_status_must_be_3xx() {
        let result = RouteDescriptor::builder("/old")
            .redirect_to("/new")
            .redirect_status(200)
            .build();
        assert!(matches!(
            result,
            Err(RouteError::InvalidRedirectStatus { status: 200, .. })
        ));
        assert!(RouteDescriptor::builder("/old")
            .redirect_to("/new")
            .redirect_status(404)
            .build()
            .is_err());
    }

    #[test]
    fn test_redirect_route_target() {
        let target = Arc::new(RouteDescriptor::page("/new").unwrap());
        let route = RouteDescriptor::builder("/old")
            .redirect_route(Arc::clone(&target))
            .build()
            .unwrap();
        assert_eq!(route.redirect_route().unwrap().route(), "/new");
        assert_eq!(route.redirect().unwrap().destination, "/new");
    }

    #[test]
    fn test_fallback_matching() {
        let fallback = Arc::new(
            RouteDescriptor::builder("/es/about")
                .route_type(RouteType::Fallback)
                .build()
                .unwrap(),
        );
        let route = RouteDescriptor::builder("/about")
            .fallback_route(fallback)
            .build()
            .unwrap();

        assert!(!route.matches("/es/about"));
        assert!(route.matches_fallback("/es/about"));
        assert!(route.matches_with_fallbacks("/es/about"));
        assert!(route.matches_with_fallbacks("/about"));
    }

    #[test]
    fn test_derive_keeps_component() {
        let route = RouteDescriptor::builder("/about")
            .component("src/pages/about.html")
            .prerender(true)
            .build()
            .unwrap();
        let derived = route.derive("/es/about", RouteType::Fallback).unwrap();
        assert_eq!(derived.component(), "src/pages/about.html");
        assert_eq!(derived.route_type(), RouteType::Fallback);
        assert!(derived.is_prerendered());
    }
}
