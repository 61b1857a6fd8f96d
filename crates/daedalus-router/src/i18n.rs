//! Locale routing configuration and fallback route synthesis.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::route::{RouteDescriptor, RouteType};

/// How locales appear in URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Every locale, the default one included, is prefixed: `/en/about`.
    PrefixAlways,
    /// The default locale lives at the root, others are prefixed.
    #[default]
    PrefixOtherLocales,
}

/// A configured locale.
///
/// `path` is the URL segment, `codes` the language tags it answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locale {
    /// A locale whose path and code are the same.
    Code(String),
    /// A locale with a custom path and one or more codes.
    Path {
        /// URL segment.
        path: String,
        /// Language tags.
        codes: Vec<String>,
    },
}

impl Locale {
    /// Returns the URL segment.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Code(code) => code,
            Self::Path { path, .. } => path,
        }
    }

    /// Returns the language tags for this locale.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        match self {
            Self::Code(code) => vec![code.as_str()],
            Self::Path { codes, .. } => codes.iter().map(String::as_str).collect(),
        }
    }
}

/// Locale routing settings shared by the route table, middleware and shells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct I18nRouting {
    /// Locale used when none is present in the URL.
    pub default_locale: String,
    /// Every supported locale.
    pub locales: Vec<Locale>,
    /// URL strategy.
    pub strategy: RoutingStrategy,
    /// Redirect `/` to `/{default_locale}` under [`RoutingStrategy::PrefixAlways`].
    pub redirect_to_default_locale: bool,
    /// Locale to serve when a page is missing for another locale.
    pub fallback: IndexMap<String, String>,
}

impl I18nRouting {
    /// Creates routing settings with one default locale.
    #[must_use]
    pub fn new(default_locale: impl Into<String>) -> Self {
        let default_locale = default_locale.into();
        Self {
            locales: vec![Locale::Code(default_locale.clone())],
            default_locale,
            strategy: RoutingStrategy::default(),
            redirect_to_default_locale: true,
            fallback: IndexMap::new(),
        }
    }

    /// Adds a locale.
    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locales.push(locale);
        self
    }

    /// Sets the URL strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Declares a fallback from one locale to another.
    #[must_use]
    pub fn fallback(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.fallback.insert(from.into(), to.into());
        self
    }

    /// Returns the URL segments of every locale.
    pub fn locale_paths(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(Locale::path)
    }

    /// Returns the locale path that prefixes `pathname`, if any.
    #[must_use]
    pub fn locale_in_path(&self, pathname: &str) -> Option<&str> {
        let first = pathname.trim_start_matches('/').split('/').next()?;
        self.locale_paths()
            .find(|path| path.eq_ignore_ascii_case(first))
    }

    /// Returns the locale path a route belongs to.
    fn route_locale<'a>(&'a self, route: &str) -> &'a str {
        self.locale_in_path(route).unwrap_or(&self.default_locale)
    }
}

/// Attaches locale fallback routes to a route list.
///
/// For every configured `from -> to` fallback, each route of the `to`
/// locale that has no counterpart in the `from` locale gets a synthesized
/// fallback route for the `from` locale. Under
/// [`RoutingStrategy::PrefixAlways`] a root `/` fallback route is added when
/// the default locale has an index page.
pub fn attach_fallback_routes(
    routes: Vec<RouteDescriptor>,
    i18n: &I18nRouting,
) -> Result<Vec<RouteDescriptor>, RouteError> {
    let mut routes = routes;

    if i18n.strategy == RoutingStrategy::PrefixAlways {
        let index = format!("/{}", i18n.default_locale);
        let index_slash = format!("{index}/");
        let has_root = routes.iter().any(|r| r.route() == "/");
        if !has_root {
            if let Some(default_index) = routes
                .iter()
                .find(|r| r.route() == index || r.route() == index_slash)
            {
                let root = default_index.derive("/", RouteType::Fallback)?;
                routes.push(root);
            }
        }
    }

    for (from, to) in &i18n.fallback {
        let to_is_default = *to == i18n.default_locale;
        let from_routes: Vec<String> = routes
            .iter()
            .filter(|r| i18n.route_locale(r.route()) == from.as_str())
            .map(|r| r.route().to_string())
            .collect();

        let mut synthesized = Vec::new();
        for (index, target) in routes.iter().enumerate() {
            if target.route_type() == RouteType::Fallback
                || i18n.route_locale(target.route()) != to.as_str()
            {
                continue;
            }
            let exists = from_routes.iter().any(|candidate| {
                if to_is_default {
                    candidate.replacen(&format!("/{from}"), "", 1) == target.route()
                } else {
                    candidate.replacen(&format!("/{from}"), &format!("/{to}"), 1) == target.route()
                }
            });
            if exists {
                continue;
            }

            let route = if to_is_default && i18n.strategy == RoutingStrategy::PrefixOtherLocales {
                if target.route() == "/" {
                    format!("/{from}")
                } else {
                    format!("/{from}{}", target.route())
                }
            } else {
                target
                    .route()
                    .replacen(&format!("/{to}"), &format!("/{from}"), 1)
            };
            if route == target.route() {
                continue;
            }
            let fallback = target.derive(&route, RouteType::Fallback)?;
            synthesized.push((index, Arc::new(fallback)));
        }

        for (index, fallback) in synthesized {
            tracing::trace!(
                route = %routes[index].route(),
                fallback = %fallback.route(),
                "attached locale fallback route"
            );
            routes[index].push_fallback(fallback);
        }
    }

    Ok(routes)
}
