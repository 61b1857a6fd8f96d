//! Core middleware trait and continuation.
//!
//! A [`Middleware`] receives the request's [`ApiContext`] and a [`Next`]
//! continuation. It may:
//!
//! - call [`Next::run`] and return the response, unchanged or transformed
//! - call [`Next::run`] and return a different response
//! - call [`Next::proceed`] and return `None`, letting the downstream
//!   response through untouched
//! - never call the continuation and return its own response
//!
//! Returning `None` without calling the continuation, or after taking the
//! downstream response with [`Next::run`], is a contract violation reported
//! as a dedicated [`RenderError`].
//!
//! # Example
//!
//! ```rust
//! use daedalus_core::{ApiContext, BoxFuture};
//! use daedalus_middleware::{Middleware, MiddlewareResult, Next};
//! use http::HeaderValue;
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered-by"
//!     }
//!
//!     fn on_request<'a>(
//!         &'a self,
//!         ctx: &'a ApiContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, MiddlewareResult> {
//!         Box::pin(async move {
//!             let mut response = next.run(ctx).await?;
//!             response
//!                 .headers_mut()
//!                 .insert("x-powered-by", HeaderValue::from_static("daedalus"));
//!             Ok(Some(response))
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use daedalus_core::{ApiContext, BoxFuture, RenderError, RenderResult, Response};
use parking_lot::Mutex;

/// What a middleware hands back: its response, or `None` to defer to the
/// response stashed by [`Next::proceed`].
pub type MiddlewareResult = RenderResult<Option<Response>>;

/// The request middleware contract.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Handles the request.
    fn on_request<'a>(&'a self, ctx: &'a ApiContext, next: Next<'a>)
        -> BoxFuture<'a, MiddlewareResult>;
}

/// The terminal step of a chain: renders the route itself.
pub type RenderFn<'a> =
    Box<dyn FnOnce(&ApiContext) -> BoxFuture<'a, RenderResult<Response>> + Send + 'a>;

#[derive(Debug, Default)]
enum NextState {
    #[default]
    Pending,
    Consumed,
    Stashed(Response),
}

/// Continuation that invokes the rest of the chain.
///
/// Consumed on use, so it can be invoked at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
    state: Arc<Mutex<NextState>>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Render(RenderFn<'a>),
}

impl<'a> Next<'a> {
    /// Creates a continuation that invokes `middleware` with `next`.
    #[must_use]
    pub fn chain(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
            state: Arc::default(),
        }
    }

    /// Creates a terminal continuation that renders the route.
    #[must_use]
    pub fn render<F>(render: F) -> Self
    where
        F: FnOnce(&ApiContext) -> BoxFuture<'a, RenderResult<Response>> + Send + 'a,
    {
        Self {
            inner: NextInner::Render(Box::new(render)),
            state: Arc::default(),
        }
    }

    /// Runs the rest of the chain and returns its response.
    pub async fn run(self, ctx: &'a ApiContext) -> RenderResult<Response> {
        let Self { inner, state } = self;
        *state.lock() = NextState::Consumed;
        match inner {
            NextInner::Chain { middleware, next } => call_middleware(middleware, ctx, *next).await,
            NextInner::Render(render) => render(ctx).await,
        }
    }

    /// Runs the rest of the chain and keeps its response as this
    /// middleware's result.
    ///
    /// Use this when the middleware only needs to run code around the
    /// render and then return `Ok(None)`.
    pub async fn proceed(self, ctx: &'a ApiContext) -> RenderResult<()> {
        let state = Arc::clone(&self.state);
        let response = self.run(ctx).await?;
        *state.lock() = NextState::Stashed(response);
        Ok(())
    }
}

/// Invokes one middleware and enforces its contract.
pub async fn call_middleware<'a>(
    middleware: &'a dyn Middleware,
    ctx: &'a ApiContext,
    next: Next<'a>,
) -> RenderResult<Response> {
    let state = Arc::clone(&next.state);
    if let Some(response) = middleware.on_request(ctx, next).await? {
        return Ok(response);
    }

    let outcome = std::mem::take(&mut *state.lock());
    match outcome {
        NextState::Stashed(response) => Ok(response),
        NextState::Consumed => {
            tracing::error!(
                middleware = middleware.name(),
                "middleware took the downstream response and returned nothing"
            );
            Err(RenderError::MiddlewareResponseDropped {
                middleware: middleware.name(),
            })
        }
        NextState::Pending => {
            tracing::error!(
                middleware = middleware.name(),
                "middleware neither called next() nor returned a response"
            );
            Err(RenderError::MiddlewareNoResponse {
                middleware: middleware.name(),
            })
        }
    }
}

/// A middleware backed by a closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a ApiContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a closure-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a ApiContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a ApiContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        (self.func)(ctx, next)
    }
}

/// Wraps a closure as a shareable middleware.
///
/// ```rust
/// use daedalus_middleware::{middleware_fn, Middleware};
///
/// let timing = middleware_fn("timing", |ctx, next| {
///     Box::pin(async move {
///         let started = std::time::Instant::now();
///         let response = next.run(ctx).await?;
///         tracing::debug!(elapsed = ?started.elapsed(), "rendered");
///         Ok(Some(response))
///     })
/// });
/// assert_eq!(timing.name(), "timing");
/// ```
pub fn middleware_fn<F>(name: &'static str, func: F) -> Arc<dyn Middleware>
where
    F: for<'a> Fn(&'a ApiContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware::new(name, func))
}
