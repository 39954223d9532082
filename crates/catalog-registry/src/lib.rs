//! # Catalog Registry
//!
//! Service registry for dynamic service discovery.
//!
//! This crate provides:
//! - The [`Catalog`], which enforces the service/node invariants
//! - Pluggable storage (in-memory with DashMap, or a JSON file store)
//! - HTTP API for registering, deregistering and discovering services
//! - Per-client rate limiting
//! - Transport configuration (TCP, Unix Domain Sockets)
//! - Standalone server executable

pub mod api;
pub mod catalog;
pub mod config;
pub mod rate_limit;
pub mod server;
pub mod storage;
pub mod transport;
pub mod types;

// Re-export commonly used items
pub use catalog::{Catalog, Deregistration, Registration};
pub use catalog_common::{DeregisterOutcome, RegisterOutcome};
pub use config::RegistryConfig;
pub use rate_limit::ClientRateLimiter;
pub use server::RegistryServer;
pub use storage::{FileStore, MemoryStore, ServiceStore};
pub use transport::TransportConfig;
pub use types::{Node, Service};
