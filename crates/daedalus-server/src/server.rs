//! HTTP transport.
//!
//! [`Server`] accepts HTTP/1 connections with hyper on tokio, buffers each
//! request body, serves the static layer first and hands everything else
//! to an [`App`] or a [`DevHandler`].
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus_server::{App, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app: App = build_app()?;
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:4321").build();
//!     Server::new(config, app).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use daedalus_core::{Request, Response, ResponseExt};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::app::{App, RenderOptions};
use crate::config::ServerConfig;
use crate::dev::DevHandler;
use crate::error::ServerError;
use crate::render::strip_base;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::static_files::StaticAssets;

enum Dispatcher {
    App(App),
    Dev(DevHandler),
}

impl Dispatcher {
    fn base(&self) -> &str {
        match self {
            Self::App(app) => app.base(),
            Self::Dev(dev) => &dev.config().base,
        }
    }

    async fn dispatch(&self, request: Request, options: RenderOptions) -> Response {
        match self {
            Self::App(app) => app.render(request, options).await,
            Self::Dev(dev) => dev.handle(request, options).await,
        }
    }
}

/// The Daedalus HTTP server.
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
    static_assets: Option<StaticAssets>,
}

impl Server {
    /// Creates a production server.
    #[must_use]
    pub fn new(config: ServerConfig, app: App) -> Self {
        Self::with_dispatcher(config, Dispatcher::App(app))
    }

    /// Creates a development server.
    #[must_use]
    pub fn dev(config: ServerConfig, handler: DevHandler) -> Self {
        Self::with_dispatcher(config, Dispatcher::Dev(handler))
    }

    fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let static_assets = config.static_dir().map(StaticAssets::new);
        Self {
            config,
            dispatcher,
            static_assets,
        }
    }

    /// Returns the transport configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Accepts connections on an already bound listener until `shutdown`
    /// triggers, then waits for open connections up to the shutdown timeout.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "waiting for open connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }
        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(request, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);
        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        &self,
        request: http::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response, Infallible> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(remote = %remote_addr, error = %e, "failed to read request body");
                return Ok(Response::text(
                    http::StatusCode::BAD_REQUEST,
                    "failed to read request body",
                ));
            }
        };
        let request = Request::from_parts(parts, body);
        tracing::debug!(method = %request.method(), path = %request.uri().path(), "request");

        if let Some(response) = self.serve_static(&request).await {
            return Ok(response);
        }

        let options = RenderOptions::new().client_address(remote_addr.ip().to_string());
        Ok(self.dispatcher.dispatch(request, options).await)
    }

    async fn serve_static(&self, request: &Request) -> Option<Response> {
        let assets = self.static_assets.as_ref()?;
        let pathname = strip_base(request.uri().path(), self.dispatcher.base());
        match assets
            .serve(&pathname, request.method(), request.headers())
            .await
        {
            Ok(response) => Some(response),
            Err(e) if e.falls_through() => None,
            Err(e) => {
                tracing::debug!(%pathname, error = %e, "static file rejected");
                Some(Response::with_status(e.status_code()))
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.dispatcher {
            Dispatcher::App(_) => "production",
            Dispatcher::Dev(_) => "development",
        };
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("mode", &mode)
            .field("static_assets", &self.static_assets)
            .finish()
    }
}
