//! Registry server: binds the transport and serves the API router.
//!
//! # Rust Learning Note
//!
//! ## Graceful Shutdown
//!
//! ```rust,ignore
//! axum::serve(listener, router)
//!     .with_graceful_shutdown(shutdown_signal())
//!     .await?;
//! ```
//!
//! When the future passed to `with_graceful_shutdown` completes, axum stops
//! accepting connections and waits for in-flight requests to finish. The
//! future is generic, so tests hand in a oneshot receiver instead of a
//! signal listener.

use std::future::Future;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::net::UnixListener;

use crate::{
    api::create_router, catalog::Catalog, rate_limit::ClientRateLimiter,
    transport::TransportConfig,
};

/// Service catalog HTTP server.
pub struct RegistryServer {
    catalog: Arc<Catalog>,
    transport: TransportConfig,
    rate_limit: Option<NonZeroU32>,
}

impl RegistryServer {
    pub fn new(catalog: Arc<Catalog>, transport: TransportConfig) -> Self {
        Self {
            catalog,
            transport,
            rate_limit: None,
        }
    }

    /// Limits each client address to `per_minute` requests.
    pub fn with_rate_limit(mut self, per_minute: Option<NonZeroU32>) -> Self {
        self.rate_limit = per_minute;
        self
    }

    fn router(&self) -> Router {
        let limiter = self
            .rate_limit
            .map(|per_minute| Arc::new(ClientRateLimiter::per_minute(per_minute)));
        create_router(Arc::clone(&self.catalog), limiter)
    }

    /// Runs until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Starting registry server: {} (storage: {})",
            self.transport.describe(),
            self.catalog.store().describe()
        );
        match self.rate_limit {
            Some(per_minute) => info!("Rate limit: {} requests/minute per client", per_minute),
            None => info!("Rate limit: disabled"),
        }

        match self.transport.clone() {
            TransportConfig::Tcp { listen, port } => {
                let listener = TcpListener::bind((listen, port))
                    .await
                    .with_context(|| format!("Failed to bind {}:{}", listen, port))?;
                self.serve_tcp(listener, shutdown).await
            }

            #[cfg(unix)]
            TransportConfig::UnixSocket { path } => {
                self.run_unix_socket(&path, shutdown).await
            }
        }
    }

    /// Serves on an already bound TCP listener.
    ///
    /// Binding to port 0 and passing the listener here lets callers learn
    /// the chosen port before the server starts.
    pub async fn serve_tcp<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().context("Failed to read local address")?;
        info!("Server listening on {}", addr);

        // ConnectInfo hands the peer address to the rate limiter.
        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        info!("Server stopped");
        Ok(())
    }

    #[cfg(unix)]
    async fn run_unix_socket<F>(self, path: &std::path::Path, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Binding to Unix socket: {}", path.display());

        // A stale socket file from an earlier run blocks bind().
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind {}", path.display()))?;
        info!("Server listening on {}", path.display());

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed");

        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove socket {}: {}", path.display(), e);
        }
        info!("Server stopped");
        result
    }
}

/// Completes on SIGINT or SIGTERM (Ctrl+C elsewhere).
pub async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM signal"),
                    _ = sigint.recv() => info!("Received SIGINT signal"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers, falling back to Ctrl+C: {}", e);
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C signal");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C signal");
        }
    }
}
