//! Route parameter storage.
//!
//! Parameters resolved from a pathname are stored in declaration order.
//! A parameter can be *unset*: an optional rest segment (`[...path]`) that
//! consumed nothing is present by name but carries no value.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Resolved route parameters.
///
/// # Example
///
/// ```rust
/// use daedalus_router::Params;
///
/// let mut params = Params::new();
/// params.push("slug", "hello-world");
/// params.push_unset("rest");
///
/// assert_eq!(params.get("slug"), Some("hello-world"));
/// assert_eq!(params.get("rest"), None);
/// assert!(params.contains("rest"));
/// assert!(params.is_unset("rest"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, Option<String>); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a params set with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Adds a parameter with a value, replacing any previous entry of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert(name.into(), Some(value.into()));
    }

    /// Adds a parameter that is declared by the route but has no value.
    pub fn push_unset(&mut self, name: impl Into<String>) {
        self.insert(name.into(), None);
    }

    fn insert(&mut self, name: String, value: Option<String>) {
        if let Some(slot) = self.inner.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.inner.push((name, value));
        }
    }

    /// Returns the value for a parameter by name.
    ///
    /// Unset parameters return `None`, same as unknown ones.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns true if the parameter is declared, set or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// Returns true if the parameter is declared but has no value.
    #[must_use]
    pub fn is_unset(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, v)| n == name && v.is_none())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters, unset ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, Option<&'a str>);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Option<String>)>,
        fn(&'a (String, Option<String>)) -> (&'a str, Option<&'a str>),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Params {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut params = Self::with_capacity(N);
        for (name, value) in pairs {
            params.push(name, value);
        }
        params
    }
}
