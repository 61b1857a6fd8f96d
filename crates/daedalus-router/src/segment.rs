//! Route pattern segments.
//!
//! A route such as `/blog/[lang]-[slug]/[...rest]` is split on `/` into
//! segments, and every segment into parts. Each part is either literal
//! text, a dynamic parameter (`[name]`, exactly one path segment) or a
//! rest parameter (`[...name]`, zero or more path segments).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::params::Params;

/// One piece of a route segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePart {
    /// Literal text, or the parameter name for dynamic and rest parts.
    pub content: String,
    /// Whether this part is a parameter.
    pub dynamic: bool,
    /// Whether this part is a rest parameter (implies `dynamic`).
    pub spread: bool,
}

impl RoutePart {
    /// Creates a literal part.
    #[must_use]
    pub fn literal(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            dynamic: false,
            spread: false,
        }
    }

    /// Creates a dynamic part.
    #[must_use]
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            content: name.into(),
            dynamic: true,
            spread: false,
        }
    }

    /// Creates a rest part.
    #[must_use]
    pub fn spread(name: impl Into<String>) -> Self {
        Self {
            content: name.into(),
            dynamic: true,
            spread: true,
        }
    }
}

/// A parsed route segment.
pub type Segment = Vec<RoutePart>;

/// Trailing slash policy applied to compiled patterns and generated paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Paths must end with `/`.
    Always,
    /// Paths must not end with `/`.
    Never,
    /// Both forms match.
    #[default]
    Ignore,
}

/// Splits a route into segments of parts.
///
/// Returns an error for unclosed brackets, empty parameter names and
/// routes declaring more than one rest parameter.
pub fn parse_route(route: &str) -> Result<Vec<Segment>, RouteError> {
    let mut segments = Vec::new();
    let mut spreads = 0;

    for raw in route.split('/').filter(|s| !s.is_empty()) {
        let segment = parse_segment(route, raw)?;
        spreads += segment.iter().filter(|p| p.spread).count();
        segments.push(segment);
    }

    if spreads > 1 {
        return Err(RouteError::MultipleRestSegments {
            route: route.to_string(),
        });
    }

    Ok(segments)
}

fn parse_segment(route: &str, raw: &str) -> Result<Segment, RouteError> {
    let mut parts = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        match rest.find('[') {
            Some(0) => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| RouteError::invalid(route, "unclosed bracket"))?;
                let inner = &rest[1..close];
                let part = match inner.strip_prefix("...") {
                    Some(name) => RoutePart::spread(name),
                    None => RoutePart::dynamic(inner),
                };
                if part.content.is_empty() {
                    return Err(RouteError::invalid(route, "empty parameter name"));
                }
                if part.content.contains('[') {
                    return Err(RouteError::invalid(route, "nested brackets"));
                }
                if parts.last().is_some_and(|p: &RoutePart| p.dynamic) {
                    return Err(RouteError::invalid(
                        route,
                        "adjacent parameters need a literal separator",
                    ));
                }
                parts.push(part);
                rest = &rest[close + 1..];
            }
            Some(open) => {
                parts.push(RoutePart::literal(&rest[..open]));
                rest = &rest[open..];
            }
            None => {
                if rest.contains(']') {
                    return Err(RouteError::invalid(route, "unmatched closing bracket"));
                }
                parts.push(RoutePart::literal(rest));
                rest = "";
            }
        }
    }

    Ok(parts)
}

/// Compiles segments into an anchored matcher.
///
/// A segment made of a single rest part is optional as a whole, so
/// `/docs/[...path]` also matches `/docs`.
pub fn compile_pattern(
    route: &str,
    segments: &[Segment],
    trailing_slash: TrailingSlash,
) -> Result<Regex, RouteError> {
    let mut source = String::from("^");

    for segment in segments {
        if let [only] = segment.as_slice() {
            if only.spread {
                source.push_str("(?:/(.*?))?");
                continue;
            }
        }
        source.push('/');
        for part in segment {
            if part.spread {
                source.push_str("(.*?)");
            } else if part.dynamic {
                source.push_str("([^/]+?)");
            } else {
                source.push_str(&regex::escape(&part.content));
            }
        }
    }

    if segments.is_empty() {
        source.push_str("/$");
    } else {
        source.push_str(match trailing_slash {
            TrailingSlash::Always => "/$",
            TrailingSlash::Never => "$",
            TrailingSlash::Ignore => "/?$",
        });
    }

    Regex::new(&source).map_err(|source| RouteError::Regex {
        route: route.to_string(),
        source,
    })
}

/// Builds a concrete path from segments and parameter values.
///
/// Missing dynamic values render as empty text. A segment holding only an
/// unset rest parameter is dropped entirely.
pub fn generate_path(segments: &[Segment], params: &Params, trailing_slash: TrailingSlash) -> String {
    let mut path = String::new();

    for segment in segments {
        let mut rendered = String::new();
        for part in segment {
            if part.dynamic {
                let value = params.get(&part.content).unwrap_or_default();
                rendered.push_str(&encode_param(value, part.spread));
            } else {
                rendered.push_str(&part.content);
            }
        }
        let only_spread = segment.len() == 1 && segment[0].spread;
        if only_spread && rendered.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(&rendered);
    }

    if path.is_empty() {
        return "/".to_string();
    }
    if trailing_slash == TrailingSlash::Always {
        path.push('/');
    }
    path
}

/// Percent-encodes a param value for use in a path.
///
/// Rest values keep their `/` separators.
pub fn encode_param(value: &str, spread: bool) -> String {
    if spread {
        value
            .split('/')
            .map(|piece| urlencoding::encode(piece).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    } else {
        urlencoding::encode(value).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_route() {
        let segments = parse_route("/about/team").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![RoutePart::literal("about")]);
        assert_eq!(segments[1], vec![RoutePart::literal("team")]);
    }

    #[test]
    fn test_parse_root() {
        assert!(parse_route("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_mixed_segment() {
        let segments = parse_route("/[lang]-[id].json").unwrap();
        assert_eq!(
            segments[0],
            vec![
                RoutePart::dynamic("lang"),
                RoutePart::literal("-"),
                RoutePart::dynamic("id"),
                RoutePart::literal(".json"),
            ]
        );
    }

    #[test]
    fn test_parse_spread() {
        let segments = parse_route("/docs/[...path]").unwrap();
        assert_eq!(segments[1], vec![RoutePart::spread("path")]);
    }

    #[test]
    fn test_parse_rejects_unclosed_bracket() {
        assert!(matches!(
            parse_route("/blog/[slug"),
            Err(RouteError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        assert!(parse_route("/blog/[]").is_err());
    }

    #[test]
    fn test_parse_rejects_adjacent_params() {
        assert!(parse_route("/[a][b]").is_err());
    }

    #[test]
    fn test_parse_rejects_two_spreads() {
        assert!(matches!(
            parse_route("/[...a]/x/[...b]"),
            Err(RouteError::MultipleRestSegments { .. })
        ));
    }

    #[test]
    fn test_compile_root_pattern() {
        let pattern = compile_pattern("/", &[], TrailingSlash::Ignore).unwrap();
        assert_eq!(pattern.as_str(), "^/$");
        assert!(pattern.is_match("/"));
        assert!(!pattern.is_match("/a"));
    }

    #[test]
    fn test_compile_trailing_slash_policies() {
        let segments = parse_route("/about").unwrap();

        let always = compile_pattern("/about", &segments, TrailingSlash::Always).unwrap();
        assert!(always.is_match("/about/"));
        assert!(!always.is_match("/about"));

        let never = compile_pattern("/about", &segments, TrailingSlash::Never).unwrap();
        assert!(never.is_match("/about"));
        assert!(!never.is_match("/about/"));

        let ignore = compile_pattern("/about", &segments, TrailingSlash::Ignore).unwrap();
        assert!(ignore.is_match("/about"));
        assert!(ignore.is_match("/about/"));
    }

    #[test]
    fn test_compile_escapes_literals() {
        let segments = parse_route("/feed.xml").unwrap();
        let pattern = compile_pattern("/feed.xml", &segments, TrailingSlash::Ignore).unwrap();
        assert!(pattern.is_match("/feed.xml"));
        assert!(!pattern.is_match("/feedaxml"));
    }

    #[test]
    fn test_compile_optional_spread() {
        let segments = parse_route("/docs/[...path]").unwrap();
        let pattern = compile_pattern("/docs/[...path]", &segments, TrailingSlash::Ignore).unwrap();
        assert!(pattern.is_match("/docs"));
        assert!(pattern.is_match("/docs/a/b/c"));
        assert!(!pattern.is_match("/doc"));
    }

    #[test]
    fn test_generate_substitutes_params() {
        let segments = parse_route("/blog/[slug]").unwrap();
        let params = Params::from([("slug", "abc")]);
        assert_eq!(
            generate_path(&segments, &params, TrailingSlash::Ignore),
            "/blog/abc"
        );
    }

    #[test]
    fn test_generate_encodes_params() {
        let segments = parse_route("/docs/[...path]").unwrap();
        let params = Params::from([("path", "a b/c\nd")]);
        assert_eq!(
            generate_path(&segments, &params, TrailingSlash::Ignore),
            "/docs/a%20b/c%0Ad"
        );
    }

    #[test]
    fn test_generate_omits_unset_spread() {
        let segments = parse_route("/docs/[...path]").unwrap();
        let mut params = Params::new();
        params.push_unset("path");
        assert_eq!(generate_path(&segments, &params, TrailingSlash::Never), "/docs");
    }

    #[test]
    fn test_generate_trailing_slash_always() {
        let segments = parse_route("/about").unwrap();
        assert_eq!(
            generate_path(&segments, &Params::new(), TrailingSlash::Always),
            "/about/"
        );
        assert_eq!(generate_path(&[], &Params::new(), TrailingSlash::Always), "/");
    }
}
