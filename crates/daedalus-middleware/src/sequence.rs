//! Composition of several middleware into one.

use std::sync::Arc;

use daedalus_core::{ApiContext, BoxFuture};

use crate::middleware::{Middleware, MiddlewareResult, Next};

/// Middleware that runs its handlers in order.
///
/// Built by [`sequence`].
pub struct Sequence {
    handlers: Vec<Arc<dyn Middleware>>,
}

impl Sequence {
    /// Returns the composed handlers' names, in call order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Returns the number of composed handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing was composed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Middleware for Sequence {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a ApiContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let mut chain = next;
            for handler in self.handlers.iter().rev() {
                chain = Next::chain(handler.as_ref(), chain);
            }
            chain.run(ctx).await.map(Some)
        })
    }
}

/// Composes middleware so the first handler runs first.
///
/// Each handler's continuation invokes the next handler; the last one's
/// invokes whatever continuation the sequence itself receives. With no
/// handlers the sequence calls its continuation directly.
///
/// ```rust
/// use daedalus_middleware::{middleware_fn, sequence};
///
/// let first = middleware_fn("first", |ctx, next| Box::pin(async move { next.run(ctx).await.map(Some) }));
/// let second = middleware_fn("second", |ctx, next| Box::pin(async move { next.run(ctx).await.map(Some) }));
///
/// let composed = sequence([first, second]);
/// assert_eq!(composed.names(), ["first", "second"]);
/// ```
pub fn sequence(handlers: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Sequence {
    Sequence {
        handlers: handlers.into_iter().collect(),
    }
}
