//! # Daedalus Middleware
//!
//! Middleware chaining and the render pipeline for Daedalus.
//!
//! ## Request Flow
//!
//! ```text
//! RenderContext → pre-render hooks → ApiContext
//!                                        ↓
//!        i18n → user middleware … → terminal render (page / endpoint / redirect / fallback)
//!                                        ↓
//!                       endpoint result handler → Set-Cookie → Response
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Middleware`] | Request middleware contract |
//! | [`Next`] | Single-use continuation into the rest of the chain |
//! | [`sequence`] | Composes middleware, first handler outermost |
//! | [`I18nMiddleware`] | Locale routing rules |
//! | [`Pipeline`] | Renders a route for a context and unit |
//! | [`RenderUnit`] / [`UnitLoader`] | The loaded artifact behind a route |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use daedalus_core::{fixtures, page_fn, Environment, PageOutput};
//! use daedalus_middleware::{middleware_fn, sequence, Pipeline, RenderUnit};
//! use daedalus_router::RouteDescriptor;
//!
//! # tokio_test::block_on(async {
//! let unit = RenderUnit::page(page_fn(|_ctx, _api| async { Ok(PageOutput::from("hello")) }));
//! let chain = sequence([middleware_fn("pass", |ctx, next| {
//!     Box::pin(async move { next.run(ctx).await.map(Some) })
//! })]);
//!
//! let pipeline = Pipeline::builder(Environment::default()).build();
//! let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
//! let response = pipeline.render_route(ctx, &unit, Some(&chain)).await.unwrap();
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod i18n;
pub mod middleware;
pub mod pipeline;
mod sequence;
pub mod unit;

pub use i18n::{resolve_locale, I18nMiddleware, ResolvedLocale};
pub use middleware::{
    call_middleware, middleware_fn, FnMiddleware, Middleware, MiddlewareResult, Next, RenderFn,
};
pub use pipeline::{
    redirect_location, redirect_status, BeforeRenderHook, EndpointResultHandler, Passthrough,
    Pipeline, PipelineBuilder,
};
pub use sequence::{sequence, Sequence};
pub use unit::{redirect_unit, RenderUnit, SingleUnitLoader, UnitLoader, UnitMap};
