//! Locale routing.
//!
//! [`I18nMiddleware`] enforces the configured routing strategy on page and
//! fallback routes and redirects to fallback locales. It always runs ahead
//! of user middleware. [`resolve_locale`] is the matching pre-render hook:
//! it annotates the render context with the request's locales, since the
//! render step cannot receive data through a continuation.

use std::sync::Arc;

use daedalus_core::{
    current_locale, path_for_locale, preferred_locale, preferred_locale_list, ApiContext,
    BoxFuture, RenderContext, Response, ResponseExt,
};
use daedalus_router::{I18nRouting, RouteType, RoutingStrategy, TrailingSlash};
use http::{header, StatusCode};

use crate::middleware::{Middleware, MiddlewareResult, Next};

/// Locale information resolved before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale {
    /// Locale of the requested pathname.
    pub current: String,
    /// Configured locale the browser prefers most.
    pub preferred: Option<String>,
    /// Every configured locale the browser accepts.
    pub preferred_list: Vec<String>,
}

/// Pre-render hook storing a [`ResolvedLocale`] in the context annotations.
///
/// Does nothing when i18n is disabled.
pub fn resolve_locale(ctx: &mut RenderContext) {
    let Some(i18n) = ctx.i18n().cloned() else {
        return;
    };
    let headers = ctx.request().headers();
    let resolved = ResolvedLocale {
        current: current_locale(ctx.pathname(), &i18n),
        preferred: preferred_locale(headers, &i18n),
        preferred_list: preferred_locale_list(headers, &i18n),
    };
    ctx.annotations_mut().insert(resolved);
}

/// Middleware applying locale routing rules.
#[derive(Debug, Clone)]
pub struct I18nMiddleware {
    i18n: Arc<I18nRouting>,
    base: String,
    trailing_slash: TrailingSlash,
}

impl I18nMiddleware {
    /// Creates the middleware for a site mounted at `/`.
    #[must_use]
    pub fn new(i18n: Arc<I18nRouting>) -> Self {
        Self {
            i18n,
            base: String::new(),
            trailing_slash: TrailingSlash::default(),
        }
    }

    /// Sets the base path redirects are built under.
    #[must_use]
    pub fn base(mut self, base: &str) -> Self {
        self.base = base.trim_end_matches('/').to_string();
        self
    }

    /// Sets the site's trailing slash policy.
    #[must_use]
    pub fn trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    fn with_base(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn reroute(&self, ctx: &ApiContext, response: Response) -> Response {
        // Error pages live outside the locale tree.
        if matches!(ctx.route().route(), "/404" | "/500") {
            return response;
        }
        let pathname = ctx.pathname();
        let url_locale = self.i18n.locale_in_path(pathname);
        let default_path = path_for_locale(&self.i18n.default_locale, &self.i18n);

        match self.i18n.strategy {
            RoutingStrategy::PrefixOtherLocales => {
                if url_locale == Some(default_path) {
                    return not_found(response);
                }
            }
            RoutingStrategy::PrefixAlways => {
                if pathname == "/" {
                    if self.i18n.redirect_to_default_locale {
                        let mut location = self.with_base(&format!("/{default_path}"));
                        if self.trailing_slash == TrailingSlash::Always {
                            location.push('/');
                        }
                        return ctx.redirect(&location, None);
                    }
                } else if url_locale.is_none() {
                    return not_found(response);
                }
            }
        }

        let status = response.status();
        if status.as_u16() < 300 || response.headers().contains_key(header::LOCATION) {
            return response;
        }
        let Some(url_locale) = url_locale else {
            return response;
        };
        let Some(target) = self.i18n.fallback.get(url_locale) else {
            return response;
        };

        let target_path = path_for_locale(target, &self.i18n);
        let rest = pathname
            .trim_start_matches('/')
            .split_once('/')
            .map_or("", |(_, rest)| rest);
        let strip_prefix = *target == self.i18n.default_locale
            && self.i18n.strategy == RoutingStrategy::PrefixOtherLocales;

        let mut location = String::new();
        if !strip_prefix {
            location.push('/');
            location.push_str(target_path);
        }
        if !rest.is_empty() || location.is_empty() {
            location.push('/');
            location.push_str(rest);
        }
        tracing::debug!(
            pathname,
            from = url_locale,
            to = %target,
            "redirecting to fallback locale"
        );
        ctx.redirect(&self.with_base(&location), None)
    }
}

fn not_found(response: Response) -> Response {
    let mut replaced = Response::with_status(StatusCode::NOT_FOUND);
    *replaced.headers_mut() = response.into_parts().0.headers;
    replaced
}

impl Middleware for I18nMiddleware {
    fn name(&self) -> &'static str {
        "i18n"
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a ApiContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            if !matches!(ctx.route().route_type(), RouteType::Page | RouteType::Fallback) {
                next.proceed(ctx).await?;
                return Ok(None);
            }
            let response = next.run(ctx).await?;
            if response.skips_reroute() {
                return Ok(Some(response));
            }
            Ok(Some(self.reroute(ctx, response)))
        })
    }
}
