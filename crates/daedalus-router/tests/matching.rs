//! Matcher ordering properties.

use std::sync::Arc;

use daedalus_router::{match_all, RouteDescriptor, RouteType};
use proptest::prelude::*;

fn table() -> Vec<Arc<RouteDescriptor>> {
    [
        "/[...all]",
        "/[section]/[...rest]",
        "/blog/[slug]",
        "/blog/latest",
        "/[section]",
        "/about",
        "/blog/[...path]",
        "/",
    ]
    .iter()
    .map(|route| Arc::new(RouteDescriptor::page(route).unwrap()))
    .collect()
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("blog".to_string()),
        Just("about".to_string()),
        Just("latest".to_string()),
        "[a-z0-9]{1,6}",
    ]
}

proptest! {
    #[test]
    fn static_routes_precede_parameterized_routes(segments in prop::collection::vec(segment(), 0..4)) {
        let pathname = format!("/{}", segments.join("/"));
        let table = table();
        let matched = match_all(&pathname, &table);

        let first_dynamic = matched.iter().position(|r| r.is_dynamic());
        let last_static = matched.iter().rposition(|r| !r.is_dynamic());
        if let (Some(first_dynamic), Some(last_static)) = (first_dynamic, last_static) {
            prop_assert!(last_static < first_dynamic);
        }
    }

    #[test]
    fn rest_routes_come_last(segments in prop::collection::vec(segment(), 1..4)) {
        let pathname = format!("/{}", segments.join("/"));
        let table = table();
        let matched = match_all(&pathname, &table);

        let first_rest = matched.iter().position(|r| r.has_rest());
        if let Some(first_rest) = first_rest {
            prop_assert!(matched[first_rest..].iter().all(|r| r.has_rest()));
        }
    }

    #[test]
    fn every_result_matches(segments in prop::collection::vec(segment(), 0..4)) {
        let pathname = format!("/{}", segments.join("/"));
        let table = table();
        for route in match_all(&pathname, &table) {
            prop_assert!(route.matches(&pathname));
        }
    }
}

#[test]
fn test_catch_all_matches_root() {
    let table = table();
    let matched = match_all("/", &table);
    let names: Vec<_> = matched.iter().map(|r| r.route()).collect();
    assert_eq!(names, ["/", "/[...all]"]);
}

#[test]
fn test_nested_rest_order() {
    let table = table();
    let matched = match_all("/blog/a/b", &table);
    let names: Vec<_> = matched.iter().map(|r| r.route()).collect();
    assert_eq!(names, ["/[section]/[...rest]", "/blog/[...path]", "/[...all]"]);
}

#[test]
fn test_redirect_template_generation() {
    let route = RouteDescriptor::builder("/old/[slug]")
        .redirect_to("/new/[slug]")
        .build()
        .unwrap();
    assert_eq!(route.route_type(), RouteType::Redirect);

    let params = route.params_for("/old/abc").unwrap();
    let target = RouteDescriptor::page(&route.redirect().unwrap().destination).unwrap();
    let path = target.generate(&params);
    assert_eq!(path, "/new/abc");
    assert!(!path.contains('['));
}
