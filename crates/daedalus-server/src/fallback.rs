//! Error fallback: response merging and the retry state machine.
//!
//! When a render ends in a 404 or 500, the dispatch shell renders the
//! site's error page and merges it with whatever the original render
//! produced, so that headers such as cookies survive.

use daedalus_core::Response;
use http::{header, HeaderMap, StatusCode};

/// Merges an error page with the response it replaces.
///
/// - Without an original, `new` is returned, its status forced to
///   `override_status` when one is given.
/// - Otherwise the status is `override_status`, else `new`'s status when
///   the original carried the default 200, else the original's status.
/// - The original's `Content-Type` is dropped; the error page decides it.
/// - Headers are `new`'s followed by the original's, with the original
///   winning on duplicate names. `Set-Cookie` lines from both are kept.
///
/// The body is always `new`'s.
#[must_use]
pub fn merge_responses(
    new: Response,
    original: Option<Response>,
    override_status: Option<StatusCode>,
) -> Response {
    let Some(original) = original else {
        let mut new = new;
        if let Some(status) = override_status {
            *new.status_mut() = status;
        }
        return new;
    };

    let status = override_status.unwrap_or_else(|| {
        if original.status() == StatusCode::OK {
            new.status()
        } else {
            original.status()
        }
    });

    let (mut parts, body) = new.into_parts();
    let mut original_headers = original.into_parts().0.headers;
    original_headers.remove(header::CONTENT_TYPE);
    merge_headers(&mut parts.headers, original_headers);
    parts.status = status;
    Response::from_parts(parts, body)
}

fn merge_headers(target: &mut HeaderMap, source: HeaderMap) {
    let mut current = None;
    for (name, value) in source {
        // HeaderMap yields the name only on the first value of each group
        if let Some(name) = name {
            if name != header::SET_COOKIE {
                target.remove(&name);
            }
            current = Some(name);
        }
        if let Some(name) = &current {
            target.append(name.clone(), value);
        }
    }
}

/// Where a request is in the error fallback sequence.
///
/// Each failure moves one stage on. Error pages are retried once without
/// middleware, on the assumption that middleware caused the failure, and
/// then the shell gives up with a bodyless response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackStage {
    /// The requested route.
    Primary,
    /// The error page, through the route middleware.
    WithMiddleware,
    /// The error page, without middleware.
    WithoutMiddleware,
    /// Nothing left to try.
    Abort,
}

impl FallbackStage {
    /// The first error page stage.
    #[must_use]
    pub const fn error_page(skip_middleware: bool) -> Self {
        if skip_middleware {
            Self::WithoutMiddleware
        } else {
            Self::WithMiddleware
        }
    }

    /// Returns the stage after a failure at this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Primary => Self::WithMiddleware,
            Self::WithMiddleware => Self::WithoutMiddleware,
            Self::WithoutMiddleware | Self::Abort => Self::Abort,
        }
    }

    /// Returns true if middleware runs at this stage.
    #[must_use]
    pub const fn runs_middleware(self) -> bool {
        matches!(self, Self::Primary | Self::WithMiddleware)
    }

    /// Returns true once nothing is left to try.
    #[must_use]
    pub const fn is_abort(self) -> bool {
        matches!(self, Self::Abort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{body_bytes, ResponseExt};
    use http::HeaderValue;

    fn with_headers(status: StatusCode, headers: &[(&'static str, &'static str)]) -> Response {
        let mut response = Response::html("body");
        *response.status_mut() = status;
        for (name, value) in headers {
            response
                .headers_mut()
                .append(*name, HeaderValue::from_static(*value));
        }
        response
    }

    #[test]
    fn test_no_original_uses_override() {
        let merged = merge_responses(
            Response::html("error page"),
            None,
            Some(StatusCode::NOT_FOUND),
        );
        assert_eq!(merged.status(), StatusCode::NOT_FOUND);

        let merged = merge_responses(Response::with_status(StatusCode::IM_A_TEAPOT), None, None);
        assert_eq!(merged.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_original_non_default_status_wins() {
        let original = with_headers(StatusCode::NOT_FOUND, &[]);
        let page = with_headers(StatusCode::OK, &[]);
        assert_eq!(
            merge_responses(page, Some(original), None).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_original_default_status_yields() {
        let original = with_headers(StatusCode::OK, &[]);
        let page = with_headers(StatusCode::INTERNAL_SERVER_ERROR, &[]);
        assert_eq!(
            merge_responses(page, Some(original), None).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_override_beats_everything() {
        let original = with_headers(StatusCode::UNAUTHORIZED, &[]);
        let page = with_headers(StatusCode::OK, &[]);
        assert_eq!(
            merge_responses(page, Some(original), Some(StatusCode::NOT_FOUND)).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_headers_union_and_content_type() {
        let mut original = with_headers(
            StatusCode::NOT_FOUND,
            &[
                ("x-custom", "1"),
                ("x-shared", "original"),
                ("set-cookie", "session=abc"),
            ],
        );
        original.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let page = with_headers(
            StatusCode::OK,
            &[("x-shared", "page"), ("x-page", "yes"), ("set-cookie", "theme=dark")],
        );

        let merged = merge_responses(page, Some(original), None);
        let headers = merged.headers();
        assert_eq!(headers.get("x-custom").unwrap(), "1");
        assert_eq!(headers.get("x-page").unwrap(), "yes");
        assert_eq!(headers.get_all("x-shared").iter().count(), 1);
        assert_eq!(headers.get("x-shared").unwrap(), "original");
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(&body_bytes(merged.into_body()).await[..], b"body");
    }

    #[test]
    fn test_stage_sequence_terminates() {
        let mut stage = FallbackStage::Primary;
        let mut seen = vec![stage];
        while !stage.is_abort() {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            [
                FallbackStage::Primary,
                FallbackStage::WithMiddleware,
                FallbackStage::WithoutMiddleware,
                FallbackStage::Abort
            ]
        );
        assert_eq!(FallbackStage::Abort.next(), FallbackStage::Abort);
    }

    #[test]
    fn test_stage_middleware() {
        assert!(FallbackStage::error_page(false).runs_middleware());
        assert!(!FallbackStage::error_page(true).runs_middleware());
        assert_eq!(FallbackStage::error_page(true).next(), FallbackStage::Abort);
    }
}
