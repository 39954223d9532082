//! Data types for the service registry.
//!
//! # Rust Learning Note
//!
//! [`Service`] and [`Node`] are the typed aggregate stored by every
//! backend. `serde` derives the one serialization contract used at the
//! storage boundary, so backends never poke at loosely-typed documents.

use catalog_common::{NodeEndpoint, NodeId, ServiceDetails, ServiceName, ServiceSummary};
use serde::{Deserialize, Serialize};

/// One network endpoint offering a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// IP address or hostname.
    pub address: String,

    /// Port the service listens on (1-65535).
    pub service_port: u16,

    /// Internal identity of the node; never returned to callers.
    pub node_id: NodeId,
}

impl Node {
    /// The caller-visible view of this node.
    pub fn endpoint(&self) -> NodeEndpoint {
        NodeEndpoint {
            address: self.address.clone(),
            service_port: self.service_port,
        }
    }
}

/// A named service and the nodes currently offering it.
///
/// A stored service always has at least one node: removing the last node
/// deletes the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: ServiceName,
    pub description: Option<String>,
    pub nodes: Vec<Node>,
}

impl Service {
    /// Creates a service with a single node.
    pub fn new(name: ServiceName, description: Option<String>, node: Node) -> Self {
        Self {
            name,
            description,
            nodes: vec![node],
        }
    }

    /// Position of the first node with the given id.
    pub fn position_of(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| &node.node_id == node_id)
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            name: self.name.to_string(),
            description: self.description.clone(),
        }
    }

    /// Public view of the service with node ids stripped.
    pub fn details(&self) -> ServiceDetails {
        ServiceDetails {
            name: self.name.to_string(),
            description: self.description.clone(),
            nodes: self.nodes.iter().map(Node::endpoint).collect(),
        }
    }
}
