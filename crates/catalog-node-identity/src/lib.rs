//! # Catalog Node Identity
//!
//! Derives a stable node identifier from the local hardware description.
//!
//! The catalog client falls back to this identity when the caller does not
//! supply a node id. The same machine always yields the same identity, and
//! nothing is cached or written to disk between calls.
//!
//! ```no_run
//! let node_id = catalog_node_identity::get_node_identity()?;
//! assert_eq!(node_id.len(), 128);
//! # Ok::<(), catalog_node_identity::IdentityError>(())
//! ```

pub mod cpu;
pub mod error;
pub mod fingerprint;

pub use cpu::{CpuDescriptor, CpuInfoSource, HostCpuInfo};
pub use error::IdentityError;
pub use fingerprint::fingerprint;

/// Computes the identity of the machine this process runs on.
pub fn get_node_identity() -> Result<String, IdentityError> {
    derive_identity(&HostCpuInfo::default())
}

/// Computes an identity from an arbitrary descriptor source.
pub fn derive_identity(source: &dyn CpuInfoSource) -> Result<String, IdentityError> {
    let descriptor = source.describe()?;
    let identity = fingerprint(&descriptor);
    tracing::debug!(brand = %descriptor.brand, arch = %descriptor.arch, "Derived node identity");
    Ok(identity)
}
