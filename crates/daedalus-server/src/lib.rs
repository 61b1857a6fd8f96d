//! # Daedalus Server
//!
//! Request dispatch, error fallback and HTTP transport for Daedalus.
//!
//! - [`App`]: the production dispatch shell over a compiled [`Manifest`]
//! - [`DevHandler`]: the development shell over a scanned pages directory
//! - [`merge_responses`] and [`FallbackStage`]: error page reconciliation
//! - [`StaticAssets`]: the static layer served ahead of dispatch
//! - [`Server`]: hyper HTTP/1 transport with graceful shutdown
//!
//! ## Example
//!
//! ```rust
//! use daedalus_core::{body_bytes, page_fn, PageOutput, fixtures};
//! use daedalus_middleware::{RenderUnit, UnitMap};
//! use daedalus_router::{RouteDescriptor, RouteTable};
//! use daedalus_server::{App, Manifest, RenderOptions};
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::from_routes([
//!     RouteDescriptor::page("/").unwrap(),
//!     RouteDescriptor::page("/404").unwrap(),
//! ]);
//! let units = UnitMap::new()
//!     .unit("/", RenderUnit::page(page_fn(|_ctx, _api| async { Ok(PageOutput::from("home")) })))
//!     .unit("/404", RenderUnit::page(page_fn(|_ctx, _api| async {
//!         Ok(PageOutput::from("Not Found"))
//!     })));
//! let app = App::new(Manifest::builder(routes, units).build());
//!
//! let response = app.render(fixtures::get("/nowhere"), RenderOptions::new()).await;
//! assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
//! assert_eq!(&body_bytes(response.into_body()).await[..], b"Not Found");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod config;
mod dev;
mod error;
mod fallback;
mod render;
mod server;
mod shutdown;
mod static_files;

pub use app::{App, AppBuilder, ErrorOptions, Manifest, ManifestBuilder, RenderOptions};
pub use config::{ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_SHUTDOWN_TIMEOUT_SECS};
pub use dev::DevHandler;
pub use error::ServerError;
pub use fallback::{merge_responses, FallbackStage};
pub use render::MarkedNotFound;
pub use server::Server;
pub use shutdown::{ConnectionTracker, ConnectionToken, ShutdownSignal};
pub use static_files::{mime_type, StaticAssets, StaticFileError};
