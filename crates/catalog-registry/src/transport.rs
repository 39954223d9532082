//! Listening transports for the registry server.
//!
//! # Rust Learning Note
//!
//! ## Conditional Compilation
//!
//! ```rust,ignore
//! #[cfg(unix)]
//! UnixSocket { path: PathBuf },
//! ```
//!
//! An enum variant can exist on some platforms only. Every `match` over the
//! enum then needs the same `#[cfg]` on the matching arm, and the compiler
//! checks both builds for exhaustiveness.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
#[cfg(unix)]
use std::path::PathBuf;

/// Default HTTP port of the registry.
pub const DEFAULT_PORT: u16 = 8000;

/// Where the registry server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// TCP socket on the given interface and port.
    Tcp { listen: IpAddr, port: u16 },

    /// Unix domain socket (Unix only).
    #[cfg(unix)]
    UnixSocket { path: PathBuf },
}

impl TransportConfig {
    /// TCP on all interfaces.
    pub fn tcp(port: u16) -> Self {
        Self::Tcp {
            listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
        }
    }

    pub fn tcp_on(listen: IpAddr, port: u16) -> Self {
        Self::Tcp { listen, port }
    }

    #[cfg(unix)]
    pub fn unix_socket(path: impl Into<PathBuf>) -> Self {
        Self::UnixSocket { path: path.into() }
    }

    /// Returns a human-readable description of the transport.
    pub fn describe(&self) -> String {
        match self {
            TransportConfig::Tcp { listen, port } => {
                format!("TCP on {}", SocketAddr::new(*listen, *port))
            }

            #[cfg(unix)]
            TransportConfig::UnixSocket { path } => {
                format!("Unix domain socket at {}", path.display())
            }
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::tcp(DEFAULT_PORT)
    }
}
