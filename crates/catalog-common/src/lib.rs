//! # Catalog Common
//!
//! Types, wire formats and errors shared by the catalog registry server
//! and its clients.
//!
//! This crate provides the foundational abstractions that the other
//! catalog crates build upon: the error taxonomy, validated identifiers
//! and the JSON bodies exchanged over HTTP.

pub mod errors;
pub mod types;
pub mod wire;

// Re-export commonly used items
pub use errors::{Error, Result, StorageErrorKind};
pub use types::{DeregisterOutcome, NodeId, RegisterOutcome, ServiceName};
pub use wire::{
    DeregisterRequest, MessageResponse, NodeEndpoint, RegisterRequest, ServiceDetails,
    ServiceSummary, WarnResponse,
};
