// E2E test harness for the catalog registry

pub mod assertions;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_client::RegistryClient;
use catalog_registry::{Catalog, FileStore, MemoryStore, RegistryServer, ServiceStore, TransportConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A registry server running on an ephemeral localhost port.
pub struct TestRegistry {
    pub client: RegistryClient,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestRegistry {
    /// Starts a server backed by the in-memory store.
    pub async fn start_memory() -> Result<Self> {
        Self::start(Arc::new(MemoryStore::new())).await
    }

    /// Starts a server backed by a file store in `dir`.
    pub async fn start_file(dir: &Path) -> Result<Self> {
        let store = FileStore::open(dir).context("Failed to open file store")?;
        Self::start(Arc::new(store)).await
    }

    pub async fn start(store: Arc<dyn ServiceStore>) -> Result<Self> {
        init_logging();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (tx, rx) = oneshot::channel::<()>();
        let server = RegistryServer::new(
            Arc::new(Catalog::new(store)),
            TransportConfig::tcp_on(addr.ip(), addr.port()),
        );
        let handle = tokio::spawn(server.serve_tcp(listener, async {
            let _ = rx.await;
        }));

        Ok(Self {
            client: RegistryClient::new(format!("http://{}", addr)),
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Shuts the server down and waits for it to exit.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.context("Server task panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
