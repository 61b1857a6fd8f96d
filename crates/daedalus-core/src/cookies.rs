//! Request cookies and outgoing `Set-Cookie` headers.
//!
//! A [`CookieJar`] is created per request from the `Cookie` header. Pages,
//! endpoints and middleware share the same jar; whatever they set or delete
//! is appended to the final response by the pipeline.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{header, HeaderMap, HeaderValue};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// Sent with cross-site requests.
    None,
    /// Sent with same-site requests and top-level navigations.
    #[default]
    Lax,
    /// Only sent with same-site requests.
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
        }
    }
}

/// Builder for one `Set-Cookie` header.
///
/// # Example
///
/// ```rust
/// use daedalus_core::{SameSite, SetCookie};
///
/// let cookie = SetCookie::new("session", "abc123")
///     .http_only(true)
///     .same_site(SameSite::Strict)
///     .path("/");
///
/// let header = cookie.to_header_value();
/// assert!(header.starts_with("session=abc123"));
/// assert!(header.contains("HttpOnly"));
/// assert!(header.contains("SameSite=Strict"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<Duration>,
    expires: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Creates a cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Creates a cookie that expires immediately.
    #[must_use]
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "")
            .max_age(Duration::ZERO)
            .expires("Thu, 01 Jan 1970 00:00:00 GMT")
    }

    /// Sets the `Domain` attribute.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Path` attribute.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the `Max-Age` attribute.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = Some(duration);
        self
    }

    /// Sets the `Expires` attribute (HTTP date).
    #[must_use]
    pub fn expires(mut self, date: impl Into<String>) -> Self {
        self.expires = Some(date.into());
        self
    }

    /// Sets the `Secure` attribute.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the `HttpOnly` attribute.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the `SameSite` attribute.
    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Returns the cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Serializes to a `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(ref path) = self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age.as_secs()));
        }
        if let Some(ref expires) = self.expires {
            parts.push(format!("Expires={expires}"));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }

        parts.join("; ")
    }
}

#[derive(Debug, Default)]
struct JarState {
    incoming: HashMap<String, String>,
    outgoing: IndexMap<String, SetCookie>,
}

/// Shared per-request cookie jar.
///
/// Cloning the jar yields another handle to the same cookies.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    state: Arc<Mutex<JarState>>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar from the request's `Cookie` headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    incoming.insert(
                        name.trim().to_string(),
                        value.trim().trim_matches('"').to_string(),
                    );
                }
            }
        }
        Self {
            state: Arc::new(Mutex::new(JarState {
                incoming,
                outgoing: IndexMap::new(),
            })),
        }
    }

    /// Returns a cookie value, preferring values set during this request.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        if let Some(set) = state.outgoing.get(name) {
            return (set.max_age != Some(Duration::ZERO)).then(|| set.value.clone());
        }
        state.incoming.get(name).cloned()
    }

    /// Returns true if the cookie is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Queues a cookie to be set on the response.
    pub fn set(&self, cookie: SetCookie) {
        self.state
            .lock()
            .outgoing
            .insert(cookie.name.clone(), cookie);
    }

    /// Queues removal of a cookie.
    pub fn delete(&self, name: &str) {
        self.set(SetCookie::removal(name));
    }

    /// Returns the queued `Set-Cookie` header values, in the order set.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.state
            .lock()
            .outgoing
            .values()
            .map(SetCookie::to_header_value)
            .collect()
    }

    /// Appends the queued cookies to a header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for value in self.set_cookie_headers() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.append(header::SET_COOKIE, value);
            }
        }
    }
}
