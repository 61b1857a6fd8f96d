//! # Daedalus Core
//!
//! Core types and traits for the Daedalus render pipeline.
//!
//! This crate provides the foundational types used by every other layer:
//!
//! - [`Environment`] - Process-wide render settings and the route cache
//! - [`RenderContext`] - Immutable per-request render inputs
//! - [`ApiContext`] - The request API handed to middleware, pages and endpoints
//! - [`Page`] / [`Endpoint`] - Contracts for user code
//! - [`CookieJar`] / [`Locals`] - Request-scoped shared state
//! - [`RenderError`] - Everything that can go wrong during a render

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod assets;
mod context;
mod cookies;
mod environment;
mod error;
pub mod fixtures;
mod i18n;
mod locals;
mod page;
mod static_paths;
mod types;

pub use api::{ApiContext, GENERATOR};
pub use assets::{AssetRef, RouteInfo, SsrElement};
pub use context::{RenderContext, RenderContextBuilder, Resolution};
pub use cookies::{CookieJar, SameSite, SetCookie};
pub use environment::{Environment, EnvironmentBuilder, Renderer, ResolveFn, RuntimeMode};
pub use error::{RenderError, RenderResult};
pub use i18n::{
    current_locale, locale_url, parse_accept_language, path_for_locale, path_has_locale,
    preferred_locale, preferred_locale_list, BrowserLocale,
};
pub use locals::Locals;
pub use page::{endpoint_fn, page_fn, Endpoint, EndpointHandlers, Page, PageFn, PageOutput};
pub use static_paths::{
    resolve_static_path, KeyedStaticPaths, Props, RouteCache, StaticPath, StaticPathResult,
    StaticPathsFn,
};
pub use types::{
    body_bytes, empty, full, BoxBody, BoxFuture, Request, Response, ResponseExt,
    NOT_FOUND_MARKER, REROUTE_HEADER, RESPONSE_MARKER_HEADER,
};
