//! Typed HTTP client for the catalog registry.
//!
//! # Rust Learning Note
//!
//! ## One Request Path, Many Endpoints
//!
//! Every call funnels through `send()`, which returns the status and the
//! collected body. Each endpoint then matches on the status codes it
//! expects:
//!
//! ```rust,ignore
//! match status {
//!     StatusCode::CREATED => Ok(RegisterOutcome::Created),
//!     StatusCode::CONFLICT => Ok(RegisterOutcome::AlreadyExists),
//!     _ => Err(error_for(status, &body)),
//! }
//! ```
//!
//! A 404 on deregister is an ordinary outcome, not an error, so it is
//! modeled as `DeregisterOutcome::NotFound`.

use catalog_common::{
    DeregisterOutcome, DeregisterRequest, Error, MessageResponse, RegisterOutcome,
    RegisterRequest, Result, ServiceDetails, ServiceSummary,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::resolve;

/// Port registered when the caller does not give one.
pub const DEFAULT_SERVICE_PORT: u16 = 8080;

/// What to register. Unset fields are filled in by [`RegistryClient::register`].
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub description: Option<String>,
    /// IP address (kept as given) or hostname (resolved to IPv4).
    pub address: Option<String>,
    pub port: Option<u16>,
    pub node_id: Option<String>,
}

impl Registration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Catalog registry client.
///
/// The underlying hyper client pools connections, so one instance should
/// be reused for many calls.
pub struct RegistryClient {
    /// Base URL of the registry (e.g., "http://localhost:8000").
    base_url: String,

    client: Client<HttpConnector, Full<Bytes>>,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_host(host: &str, port: u16) -> Self {
        Self::new(format!("http://{}:{}", host, port))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Registers a node, filling in the default port, the local address and
    /// this machine's node identity where the registration leaves them out.
    pub async fn register(&self, registration: Registration) -> Result<RegisterOutcome> {
        let address = match registration.address.as_deref() {
            Some(host) => resolve::resolve_address(host).await?,
            None => resolve::local_address().await?,
        };
        let node_id = match registration.node_id {
            Some(id) => id,
            None => local_node_id().await?,
        };

        let request = RegisterRequest {
            name: Some(registration.name),
            description: registration.description,
            address: Some(address),
            service_port: Some(u64::from(registration.port.unwrap_or(DEFAULT_SERVICE_PORT))),
            node_id: Some(node_id),
        };
        debug!("Registering {:?}", request);

        let (status, body) = self
            .send(Method::POST, "/api/v1/catalog/register", Some(&request))
            .await?;
        match status {
            StatusCode::CREATED => Ok(RegisterOutcome::Created),
            StatusCode::CONFLICT => Ok(RegisterOutcome::AlreadyExists),
            _ => Err(error_for(status, &body)),
        }
    }

    /// Removes a node; `node_id` defaults to this machine's identity.
    pub async fn deregister(&self, name: &str, node_id: Option<String>) -> Result<DeregisterOutcome> {
        let node_id = match node_id {
            Some(id) => id,
            None => local_node_id().await?,
        };

        let request = DeregisterRequest {
            name: Some(name.to_string()),
            node_id: Some(node_id),
        };

        let (status, body) = self
            .send(Method::POST, "/api/v1/catalog/deregister", Some(&request))
            .await?;
        match status {
            StatusCode::OK => Ok(DeregisterOutcome::Removed),
            StatusCode::NOT_FOUND => Ok(DeregisterOutcome::NotFound),
            _ => Err(error_for(status, &body)),
        }
    }

    /// Lists every registered service.
    pub async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        let (status, body) = self
            .send::<()>(Method::GET, "/api/v1/catalog/services", None)
            .await?;
        match status {
            StatusCode::OK => parse_json(&body),
            _ => Err(error_for(status, &body)),
        }
    }

    /// Looks up one service. Unknown names yield `None`.
    pub async fn service_details(&self, name: &str) -> Result<Option<ServiceDetails>> {
        let path = format!("/api/v1/catalog/service/{}", urlencoding::encode(name));
        let (status, body) = self.send::<()>(Method::GET, &path, None).await?;

        match status {
            StatusCode::OK => {
                let mut found: Vec<ServiceDetails> = parse_json(&body)?;
                Ok(found.pop())
            }
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            _ => Err(error_for(status, &body)),
        }
    }

    /// Returns true if the registry answers its health check.
    pub async fn health(&self) -> Result<bool> {
        let (status, _) = self.send::<()>(Method::GET, "/api/v1/health", None).await?;
        Ok(status.is_success())
    }

    async fn send<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
    ) -> Result<(StatusCode, Bytes)> {
        let url = format!("{}{}", self.base_url, path);
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::Protocol(format!("Invalid URI {}: {}", url, e)))?;

        let payload = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| Error::Protocol(format!("Failed to serialize request: {}", e)))?,
            None => Vec::new(),
        };

        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| Error::Protocol(format!("Failed to build request: {}", e)))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| Error::Protocol(format!("HTTP request to {} failed: {}", url, e)))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Protocol(format!("Failed to read response: {}", e)))?
            .to_bytes();

        debug!("{} -> {}", url, status);
        Ok((status, bytes))
    }
}

async fn local_node_id() -> Result<String> {
    // Reads /proc and /sys, so keep it off the reactor.
    tokio::task::spawn_blocking(catalog_node_identity::get_node_identity)
        .await
        .map_err(|e| Error::Internal(format!("identity task failed: {}", e)))?
        .map_err(|e| Error::Identity(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::Protocol(format!("Failed to parse JSON: {}", e)))
}

/// Maps an unexpected response to an error, keeping the server's message.
fn error_for(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<MessageResponse>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    if status == StatusCode::BAD_REQUEST {
        Error::validation(message)
    } else {
        Error::Protocol(format!("Registry returned {}: {}", status, message))
    }
}
