//! Storage for the service registry.
//!
//! # Rust Learning Note
//!
//! ## Trait Objects at the Storage Boundary
//!
//! The catalog only talks to storage through [`ServiceStore`]:
//!
//! ```rust,ignore
//! let store: Arc<dyn ServiceStore> = Arc::new(MemoryStore::new());
//! let catalog = Catalog::new(store);
//! ```
//!
//! `Send + Sync` on the trait lets one store be shared by every request
//! handler thread. Backends are responsible for their own internal
//! locking and for any timeouts on the underlying medium; the catalog
//! serializes read-modify-write cycles per service name on top.

use catalog_common::{NodeId, Result, ServiceName};

use crate::types::{Node, Service};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Exact-value match on the fields of one element of `Service::nodes`.
///
/// Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeQuery {
    pub address: Option<String>,
    pub service_port: Option<u16>,
    pub node_id: Option<NodeId>,
}

impl NodeQuery {
    /// Matches a node with exactly this address, port and id.
    pub fn exact(node: &Node) -> Self {
        Self {
            address: Some(node.address.clone()),
            service_port: Some(node.service_port),
            node_id: Some(node.node_id.clone()),
        }
    }

    /// Matches any node with the given id.
    pub fn by_id(node_id: &NodeId) -> Self {
        Self {
            node_id: Some(node_id.clone()),
            ..Self::default()
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.address.as_ref().map_or(true, |a| a == &node.address)
            && self.service_port.map_or(true, |p| p == node.service_port)
            && self.node_id.as_ref().map_or(true, |id| id == &node.node_id)
    }
}

/// Predicate over stored services.
///
/// `name` is an equality test on the service name; `node` is a membership
/// test: the service matches if any of its nodes matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceQuery {
    pub name: Option<ServiceName>,
    pub node: Option<NodeQuery>,
}

impl ServiceQuery {
    /// Matches every service.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_name(name: &ServiceName) -> Self {
        Self {
            name: Some(name.clone()),
            node: None,
        }
    }

    pub fn with_node(mut self, node: NodeQuery) -> Self {
        self.node = Some(node);
        self
    }

    pub fn matches(&self, service: &Service) -> bool {
        self.name.as_ref().map_or(true, |n| n == &service.name)
            && self
                .node
                .as_ref()
                .map_or(true, |q| service.nodes.iter().any(|node| q.matches(node)))
    }
}

/// Persistence backend for catalog records.
///
/// Implementations key records by `Service::name`.
pub trait ServiceStore: Send + Sync {
    /// Returns the first service matching `query`, or `Error::NotFound`.
    fn get(&self, query: &ServiceQuery) -> Result<Service>;

    /// Returns every matching service in insertion order.
    fn filter(&self, query: &ServiceQuery) -> Result<Vec<Service>>;

    /// Inserts the service, or replaces the stored record with the same name
    /// keeping its original position.
    fn save(&self, service: &Service) -> Result<()>;

    /// Removes the record with the same name. Removing an absent record is
    /// not an error.
    fn delete(&self, service: &Service) -> Result<()>;

    /// Short backend name for logs.
    fn describe(&self) -> String;
}
