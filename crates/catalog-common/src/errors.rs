//! Error types for the service catalog.
//!
//! # Rust Learning Note
//!
//! Rust has no exceptions - fallible operations return `Result<T, E>`.
//! This module defines the single error type used by the catalog crates.
//!
//! ```rust
//! use catalog_common::{Error, Result};
//!
//! fn check(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(Error::null_field("name"));
//!     }
//!     Ok(())
//! }
//!
//! fn caller() -> Result<()> {
//!     // The ? operator propagates the error to our caller
//!     check("web")?;
//!     Ok(())
//! }
//! ```
//!
//! "Not found" and "already exists" are ordinary outcomes of catalog
//! operations and are modelled as return values, not as errors. The
//! variants here are reserved for conditions the caller has to react to.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Whether a storage failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Transient condition (timeout, interrupted call, dropped connection).
    Retryable,
    /// Anything else: corrupt data, permission denied, disk full.
    Fatal,
}

impl StorageErrorKind {
    /// Classifies an I/O error.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => StorageErrorKind::Retryable,
            _ => StorageErrorKind::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErrorKind::Retryable => write!(f, "retryable"),
            StorageErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Main error type for catalog operations.
///
/// # Rust Learning Note
///
/// `thiserror` derives `Display` and `std::error::Error` from the
/// `#[error(...)]` attributes. Each variant carries its own context, and
/// callers can `match` on the variant instead of parsing messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing, empty or malformed input.
    #[error("{message}")]
    Validation { message: String },

    /// A record the storage layer was asked for does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The storage backend failed to read or write.
    #[error("Storage error ({kind}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
    },

    /// The local node identity could not be derived.
    #[error("Node identity unavailable: {0}")]
    Identity(String),

    /// HTTP transport error on the client side.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal error (shouldn't happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Validation error for a required field that was absent or empty.
    pub fn null_field(field: &str) -> Self {
        Self::validation(format!("'{}' can't be null", field))
    }

    /// Creates a NotFound error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a Storage error of the given kind.
    pub fn storage(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self::Storage {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an I/O failure from a storage backend, classifying it.
    pub fn storage_io(err: io::Error, what: impl fmt::Display) -> Self {
        Self::storage(StorageErrorKind::from_io(&err), format!("{}: {}", what, err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns the storage classification, if this is a storage failure.
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            Error::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
