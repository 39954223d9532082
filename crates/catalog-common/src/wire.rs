//! JSON bodies exchanged between catalog clients and the registry.
//!
//! Request fields are all optional on the wire: a missing field is a
//! validation failure reported by the registry, not a parse failure, so
//! the caller gets a `'<field>' can't be null` message naming it.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/catalog/register`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub service_port: Option<u64>,
    pub node_id: Option<String>,
}

/// Body of `POST /api/v1/catalog/deregister`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeregisterRequest {
    pub name: Option<String>,
    pub node_id: Option<String>,
}

/// Generic `{"message": ...}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{"warn": ...}` body returned for duplicate registrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarnResponse {
    pub warn: String,
}

/// One entry of `GET /api/v1/catalog/services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub description: Option<String>,
}

/// A node as seen by callers: the node id is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub address: String,
    pub service_port: u16,
}

/// Body element of `GET /api/v1/catalog/service/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<NodeEndpoint>,
}
