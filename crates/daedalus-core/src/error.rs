//! Render errors.
//!
//! [`RenderError`] covers everything that can go wrong while one request is
//! rendered. The dispatch shells map these onto 404/500 error pages:
//!
//! | Variant | Recoverable | Fallback status |
//! |---|---|---|
//! | `NoMatchingStaticPath` | yes, try the next candidate route | 500 once no candidate is left |
//! | `EndpointNotFound` | yes | 404, merged with the endpoint response |
//! | `MiddlewareNoResponse` | no, user error | 500 |
//! | `MiddlewareResponseDropped` | no, user error | 500 |
//! | everything else | no | 500 |
//!
//! Build-time failures such as adapter capability mismatches are not render
//! errors; they abort startup instead.

use http::StatusCode;
use thiserror::Error;

use crate::types::Response;

/// Result alias for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while rendering a request.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A dynamic route has no enumerated static path for the requested params.
    #[error("no matching static path found for '{pathname}' on route '{route}'")]
    NoMatchingStaticPath {
        /// Route pattern.
        route: String,
        /// Requested pathname.
        pathname: String,
    },

    /// An endpoint signalled that nothing handled the request.
    #[error("endpoint not found")]
    EndpointNotFound {
        /// The endpoint's own response, kept for merging.
        response: Option<Response>,
    },

    /// A middleware neither called `next` nor returned a response.
    #[error(
        "middleware '{middleware}' returned without calling next() and without returning a response"
    )]
    MiddlewareNoResponse {
        /// Name of the offending middleware.
        middleware: &'static str,
    },

    /// A middleware called `next` but dropped the response instead of returning it.
    #[error(
        "middleware '{middleware}' called next() but returned nothing; return the response or use Next::proceed"
    )]
    MiddlewareResponseDropped {
        /// Name of the offending middleware.
        middleware: &'static str,
    },

    /// The loaded render unit lacks what the route type needs.
    #[error("route '{route}' has no {missing} export")]
    MissingExport {
        /// Route pattern.
        route: String,
        /// `"page"` or `"endpoint"`.
        missing: &'static str,
    },

    /// No render unit could be loaded for a component.
    #[error("no render unit registered for component '{component}'")]
    UnitNotFound {
        /// Component identifier.
        component: String,
    },

    /// The client address was read but the adapter never supplied one.
    #[error("client address is not available from adapter '{adapter}'")]
    ClientAddressNotAvailable {
        /// Adapter name.
        adapter: String,
    },

    /// Locals supplied by the host were not a JSON object.
    #[error("locals must be an object")]
    LocalsNotAnObject,

    /// Page or endpoint code reported a failure.
    #[error("render failed: {message}")]
    Render {
        /// Failure description.
        message: String,
    },

    /// Any other error from user code.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RenderError {
    /// Creates a render failure with a message.
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates an endpoint-not-found signal carrying the endpoint's response.
    #[must_use]
    pub fn endpoint_not_found(response: Response) -> Self {
        Self::EndpointNotFound {
            response: Some(response),
        }
    }

    /// Returns true if the caller can keep going, e.g. by trying another route.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingStaticPath { .. } | Self::EndpointNotFound { .. }
        )
    }

    /// Returns true for middleware contract violations.
    #[must_use]
    pub const fn is_middleware_contract(&self) -> bool {
        matches!(
            self,
            Self::MiddlewareNoResponse { .. } | Self::MiddlewareResponseDropped { .. }
        )
    }

    /// Returns the status of the error page this error falls back to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::EndpointNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;

    #[test]
    fn test_no_matching_static_path() {
        let err = RenderError::NoMatchingStaticPath {
            route: "/blog/[slug]".to_string(),
            pathname: "/blog/missing".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("/blog/missing"));
    }

    #[test]
    fn test_endpoint_not_found_keeps_response() {
        let err = RenderError::endpoint_not_found(Response::with_status(StatusCode::NOT_FOUND));
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            RenderError::EndpointNotFound { response: Some(_) }
        ));
    }

    #[test]
    fn test_middleware_contract_errors() {
        let err = RenderError::MiddlewareNoResponse { middleware: "auth" };
        assert!(err.is_middleware_contract());
        assert!(!err.is_recoverable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("'auth'"));
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err: RenderError = anyhow::anyhow!("database unavailable").into();
        assert_eq!(err.to_string(), "database unavailable");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
