//! Specificity-ordered route matching.
//!
//! When several routes match a pathname, they are ordered from most to
//! least specific:
//!
//! 1. **Static routes** (no parameters), e.g. `/blog/latest`
//! 2. **Dynamic routes**, prerendered ones first, e.g. `/blog/[slug]`
//! 3. **Rest routes**, deeper ones first, then prerendered ones first,
//!    e.g. `/blog/[...path]` before `/[...path]`
//!
//! Remaining ties keep declaration order.

use std::borrow::Cow;
use std::sync::Arc;

use crate::route::RouteDescriptor;

/// Collapses runs of `/` into a single slash.
///
/// ```rust
/// use daedalus_router::normalize_pathname;
///
/// assert_eq!(normalize_pathname("//blog///post"), "/blog/post");
/// assert_eq!(normalize_pathname("/about"), "/about");
/// ```
#[must_use]
pub fn normalize_pathname(pathname: &str) -> Cow<'_, str> {
    if !pathname.contains("//") {
        return Cow::Borrowed(pathname);
    }
    let mut out = String::with_capacity(pathname.len());
    let mut previous_slash = false;
    for c in pathname.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Sort key: lower sorts first.
fn specificity(route: &RouteDescriptor) -> (u8, usize, u8) {
    let not_prerendered = u8::from(!route.is_prerendered());
    if route.has_rest() {
        (2, usize::MAX - route.depth(), not_prerendered)
    } else if route.is_dynamic() {
        (1, 0, not_prerendered)
    } else {
        (0, 0, 0)
    }
}

fn sort_by_specificity(routes: &mut [&Arc<RouteDescriptor>]) {
    // stable: equal keys keep declaration order
    routes.sort_by_key(|r| specificity(r));
}

/// Returns every route whose pattern matches the pathname, most specific first.
///
/// The pathname is normalized before matching. The route slice is never
/// modified.
#[must_use]
pub fn match_all<'a>(pathname: &str, routes: &'a [Arc<RouteDescriptor>]) -> Vec<&'a Arc<RouteDescriptor>> {
    let pathname = normalize_pathname(pathname);
    let mut matched: Vec<_> = routes.iter().filter(|r| r.matches(&pathname)).collect();
    sort_by_specificity(&mut matched);
    matched
}

/// Returns the most specific route matching the pathname.
///
/// Unlike [`match_all`], a route also matches when one of its locale
/// fallback routes matches.
#[must_use]
pub fn match_one<'a>(pathname: &str, routes: &'a [Arc<RouteDescriptor>]) -> Option<&'a Arc<RouteDescriptor>> {
    let pathname = normalize_pathname(pathname);
    let mut matched: Vec<_> = routes
        .iter()
        .filter(|r| r.matches_with_fallbacks(&pathname))
        .collect();
    sort_by_specificity(&mut matched);
    matched.into_iter().next()
}
