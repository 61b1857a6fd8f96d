//! Per-request locals.
//!
//! Locals are a JSON object shared by middleware, pages and endpoints for
//! the duration of one request. The host runtime may seed them through the
//! render options.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{RenderError, RenderResult};

/// Shared handle to a request's locals.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl Locals {
    /// Creates empty locals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates locals from a host-supplied value, which must be an object.
    pub fn from_value(value: Value) -> RenderResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                inner: Arc::new(RwLock::new(map)),
            }),
            _ => Err(RenderError::LocalsNotAnObject),
        }
    }

    /// Returns a copy of one entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Sets an entry, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(key.into(), value)
    }

    /// Removes an entry.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    /// Returns a copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object() {
        assert!(Locals::from_value(json!({"user": "ada"})).is_ok());
        assert!(matches!(
            Locals::from_value(json!([1, 2])),
            Err(RenderError::LocalsNotAnObject)
        ));
    }

    #[test]
    fn test_shared_between_clones() {
        let locals = Locals::new();
        let other = locals.clone();
        other.insert("count", json!(1));
        assert_eq!(locals.get("count"), Some(json!(1)));
        assert_eq!(locals.remove("count"), Some(json!(1)));
        assert!(other.snapshot().is_empty());
    }
}
