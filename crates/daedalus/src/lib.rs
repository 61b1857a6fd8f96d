//! # Daedalus
//!
//! **Request rendering and route dispatch for server-rendered sites**
//!
//! Daedalus takes an incoming request and a compiled route manifest, picks
//! the route, builds a per-request render context, runs the request through
//! middleware and renders the page, endpoint or redirect behind the route.
//! Pages that end in a 404 or 500 are replaced by the site's error pages,
//! with headers and cookies from the original response kept.
//!
//! ## Quick Start
//!
//! ```rust
//! use daedalus::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::from_routes([
//!     RouteDescriptor::page("/blog/[slug]").unwrap(),
//!     RouteDescriptor::page("/404").unwrap(),
//! ]);
//! let units = UnitMap::new()
//!     .unit("/blog/[slug]", RenderUnit::page(page_fn(|_ctx, api| async move {
//!         let slug = api.param("slug").unwrap_or_default().to_string();
//!         Ok(PageOutput::Html(format!("<h1>{slug}</h1>")))
//!     })))
//!     .unit("/404", RenderUnit::page(page_fn(|_ctx, _api| async {
//!         Ok(PageOutput::from("Not Found"))
//!     })));
//! let app = App::new(Manifest::builder(routes, units).build());
//!
//! let response = app
//!     .render(daedalus::core::fixtures::get("/blog/hello"), RenderOptions::new())
//!     .await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```
//!
//! ## Serving
//!
//! ```rust,ignore
//! use daedalus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let site = ConfigLoader::new().with_production().with_file("daedalus.toml")?.load()?;
//!     daedalus::telemetry::init_logging(&site.logging.to_log_config())?;
//!
//!     let app = App::from_config(&site, compiled_routes(), compiled_units())?;
//!     Server::new(ServerConfig::from_site(&site), app).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! Request → static layer → match route → RenderContext → i18n → middleware → page / endpoint
//!                                                                               ↓
//!                      Response ← merge ← 404 / 500 error page (on 404 / 500) ←─┘
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use daedalus_core as core;

// Re-export server types
pub use daedalus_server as server;

// Re-export middleware types
pub use daedalus_middleware as middleware;

// Re-export router types
pub use daedalus_router as router;

// Re-export configuration types
pub use daedalus_config as config;

// Re-export logging and metrics
pub use daedalus_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use daedalus::prelude::*;
///
/// let table = RouteTable::from_routes([RouteDescriptor::page("/").unwrap()]);
/// assert_eq!(table.len(), 1);
/// ```
pub mod prelude {
    pub use daedalus_core::{
        endpoint_fn, page_fn, ApiContext, EndpointHandlers, Environment, Locals, PageOutput,
        RenderContext, RenderError, RenderResult, Request, Response, ResponseExt, RuntimeMode,
        SetCookie, StaticPath,
    };

    pub use daedalus_router::{
        I18nRouting, Params, RouteDescriptor, RouteTable, RouteType, RoutingStrategy,
        TrailingSlash,
    };

    pub use daedalus_middleware::{
        middleware_fn, sequence, Middleware, MiddlewareResult, Next, RenderUnit, UnitLoader,
        UnitMap,
    };

    pub use daedalus_server::{
        App, DevHandler, ErrorOptions, Manifest, RenderOptions, Server, ServerConfig,
        ServerError, ShutdownSignal,
    };

    pub use daedalus_config::{ConfigError, ConfigLoader, SiteConfig};
}
