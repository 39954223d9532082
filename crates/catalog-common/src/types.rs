//! Core identifiers used throughout the catalog.
//!
//! Both identifiers are validated at construction time, so a value of
//! either type is known to be usable as a storage key.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Length of a hardware fingerprint in hex characters (SHA-512).
pub const FINGERPRINT_HEX_LEN: usize = 128;

/// Service name - the unique, case-sensitive key of a catalog entry.
///
/// # Example
/// ```
/// use catalog_common::ServiceName;
///
/// let name = ServiceName::parse("web").unwrap();
/// assert_eq!(name.as_str(), "web");
/// assert!(ServiceName::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Validates and wraps a service name.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::null_field("name"));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServiceName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node identifier - identifies one endpoint within a service.
///
/// # Rust Learning Note
///
/// This is the **newtype pattern**: a tuple struct around `String` that
/// can only be built through [`NodeId::parse`]. Code that receives a
/// `NodeId` never has to re-check its format.
///
/// Two formats are accepted:
/// - a UUID in any format `uuid` parses (stored lowercase and hyphenated)
/// - a 128-character hex hardware fingerprint (lowercased)
///
/// # Example
/// ```
/// use catalog_common::NodeId;
///
/// let id = NodeId::parse("11111111-1111-1111-1111-111111111111").unwrap();
/// assert_eq!(id.as_str(), "11111111-1111-1111-1111-111111111111");
/// assert!(NodeId::parse("not-an-id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Validates and wraps a node identifier.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::null_field("node_id"));
        }

        // Any UUID spelling maps to the lowercase hyphenated form.
        if let Ok(uuid) = Uuid::parse_str(&id) {
            return Ok(Self(uuid.hyphenated().to_string()));
        }

        if id.len() == FINGERPRINT_HEX_LEN && id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self(id.to_ascii_lowercase()));
        }

        Err(Error::validation(format!(
            "'node_id' must be a UUID or a {}-character hex fingerprint, got '{}'",
            FINGERPRINT_HEX_LEN, id
        )))
    }

    /// Returns the node ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The node was added (or its endpoint updated).
    Created,
    /// An identical node was already registered; nothing changed.
    AlreadyExists,
}

/// Result of a deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregisterOutcome {
    /// The node is no longer registered under the service.
    Removed,
    /// No service with that name exists.
    NotFound,
}
