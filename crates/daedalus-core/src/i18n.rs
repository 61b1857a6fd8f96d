//! Locale negotiation helpers.

use daedalus_router::{I18nRouting, Locale, RoutingStrategy};
use http::{header, HeaderMap};

/// One entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserLocale {
    /// Language tag, or `*`.
    pub locale: String,
    /// Quality weight.
    pub quality: f32,
}

/// Parses `Accept-Language`, highest quality first.
///
/// Entries with an unparsable or zero weight are dropped. Equal weights keep
/// header order.
///
/// ```rust
/// use daedalus_core::parse_accept_language;
///
/// let locales = parse_accept_language("fr;q=0.8, en-US, *;q=0.1");
/// assert_eq!(locales[0].locale, "en-US");
/// assert_eq!(locales[1].locale, "fr");
/// assert_eq!(locales[2].locale, "*");
/// ```
#[must_use]
pub fn parse_accept_language(header: &str) -> Vec<BrowserLocale> {
    let mut locales: Vec<BrowserLocale> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let locale = parts.next()?.trim();
            if locale.is_empty() {
                return None;
            }
            let quality = match parts.next().map(str::trim) {
                Some(q) => q.strip_prefix("q=")?.parse::<f32>().ok()?,
                None => 1.0,
            };
            (quality > 0.0).then(|| BrowserLocale {
                locale: locale.to_string(),
                quality,
            })
        })
        .collect();
    locales.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    locales
}

fn normalize(locale: &str) -> String {
    locale.replace('_', "-").to_ascii_lowercase()
}

fn browser_locales(headers: &HeaderMap) -> Vec<BrowserLocale> {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(parse_accept_language)
        .unwrap_or_default()
}

fn locale_matching<'a>(i18n: &'a I18nRouting, tag: &str) -> Option<&'a Locale> {
    let tag = normalize(tag);
    i18n.locales
        .iter()
        .find(|locale| locale.codes().iter().any(|code| normalize(code) == tag))
}

/// Returns the configured locale the browser prefers most.
///
/// The result is the first code of the matching locale.
#[must_use]
pub fn preferred_locale(headers: &HeaderMap, i18n: &I18nRouting) -> Option<String> {
    browser_locales(headers)
        .iter()
        .filter(|b| b.locale != "*")
        .find_map(|b| locale_matching(i18n, &b.locale))
        .and_then(|locale| locale.codes().first().map(|code| (*code).to_string()))
}

/// Returns every configured locale the browser accepts, most preferred first.
///
/// A `*` entry accepts all configured locales.
#[must_use]
pub fn preferred_locale_list(headers: &HeaderMap, i18n: &I18nRouting) -> Vec<String> {
    let browser = browser_locales(headers);
    if browser.iter().any(|b| b.locale == "*") {
        return i18n
            .locales
            .iter()
            .filter_map(|l| l.codes().first().map(|code| (*code).to_string()))
            .collect();
    }
    let mut list: Vec<String> = Vec::new();
    for entry in &browser {
        if let Some(locale) = locale_matching(i18n, &entry.locale) {
            if let Some(code) = locale.codes().first() {
                if !list.iter().any(|c| c == code) {
                    list.push((*code).to_string());
                }
            }
        }
    }
    list
}

/// Returns the locale a pathname belongs to.
///
/// The first path segment naming a locale wins; otherwise the default locale.
#[must_use]
pub fn current_locale(pathname: &str, i18n: &I18nRouting) -> String {
    for segment in pathname.split('/').filter(|s| !s.is_empty()) {
        for locale in &i18n.locales {
            match locale {
                Locale::Code(code) if normalize(code) == normalize(segment) => {
                    return code.clone();
                }
                Locale::Path { path, codes } if path == segment => {
                    if let Some(code) = codes.first() {
                        return code.clone();
                    }
                }
                _ => {}
            }
        }
    }
    i18n.default_locale.clone()
}

/// Returns true if any path segment names a configured locale.
#[must_use]
pub fn path_has_locale(pathname: &str, i18n: &I18nRouting) -> bool {
    pathname
        .split('/')
        .filter(|s| !s.is_empty())
        .any(|segment| i18n.locale_paths().any(|path| normalize(path) == normalize(segment)))
}

/// Returns the URL segment of a locale given one of its codes.
#[must_use]
pub fn path_for_locale<'a>(code: &'a str, i18n: &'a I18nRouting) -> &'a str {
    i18n.locales
        .iter()
        .find(|locale| locale.codes().contains(&code))
        .map_or(code, Locale::path)
}

/// Builds the URL of `path` in `locale`, honouring the routing strategy.
#[must_use]
pub fn locale_url(locale: &str, path: &str, i18n: &I18nRouting, base: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let locale_path = path_for_locale(locale, i18n);
    let prefixed = !(locale == i18n.default_locale && i18n.strategy == RoutingStrategy::PrefixOtherLocales);

    let mut url = String::from(base);
    if prefixed {
        url.push('/');
        url.push_str(locale_path);
    }
    if !path.is_empty() {
        url.push('/');
        url.push_str(path);
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}
