//! Route table construction errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing route patterns or scanning a pages directory.
///
/// These happen at build or scan time, never while matching a request.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The route string is not a valid pattern.
    #[error("invalid route '{route}': {reason}")]
    InvalidPattern {
        /// The offending route.
        route: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// More than one rest segment was declared.
    #[error("route '{route}' declares more than one rest segment")]
    MultipleRestSegments {
        /// The offending route.
        route: String,
    },

    /// The compiled pattern was rejected by the regex engine.
    #[error("failed to compile pattern for route '{route}': {source}")]
    Regex {
        /// The offending route.
        route: String,
        /// Regex compile error.
        #[source]
        source: regex::Error,
    },

    /// A redirect route declared a status outside the 3xx range.
    #[error("redirect route '{route}' has non-redirect status {status}")]
    InvalidRedirectStatus {
        /// The offending route.
        route: String,
        /// The declared status.
        status: u16,
    },

    /// A pages directory could not be read.
    #[error("failed to scan '{}': {source}", path.display())]
    Io {
        /// The directory or file being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RouteError {
    pub(crate) fn invalid(route: &str, reason: &'static str) -> Self {
        Self::InvalidPattern {
            route: route.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_display() {
        let err = RouteError::invalid("/blog/[", "unclosed bracket");
        assert_eq!(err.to_string(), "invalid route '/blog/[': unclosed bracket");
    }

    #[test]
    fn test_multiple_rest_display() {
        let err = RouteError::MultipleRestSegments {
            route: "/[...a]/[...b]".to_string(),
        };
        assert!(err.to_string().contains("more than one rest segment"));
    }
}
