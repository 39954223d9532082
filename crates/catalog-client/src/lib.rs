//! # Catalog Client
//!
//! Async client for the service catalog registry.
//!
//! ```rust,ignore
//! let client = RegistryClient::from_host("registry.local", 8000);
//! client.register(Registration::new("web")).await?;
//! let details = client.service_details("web").await?;
//! ```
//!
//! Registrations that leave out the address or node id are completed
//! locally: the address from this host's name, the node id from
//! `catalog_node_identity::get_node_identity()`.

pub mod client;
pub mod resolve;

pub use catalog_common::{
    DeregisterOutcome, Error, RegisterOutcome, Result, ServiceDetails, ServiceSummary,
};
pub use client::{Registration, RegistryClient, DEFAULT_SERVICE_PORT};
