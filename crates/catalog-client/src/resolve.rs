//! Address resolution for registrations.

use std::net::{IpAddr, SocketAddr};

use catalog_common::{Error, Result};
use tracing::debug;

/// Turns `host` into the address string sent with a registration.
///
/// An IP literal of either family is accepted as is (IPv6 included) and
/// only normalized to its canonical text. A hostname goes through the
/// system resolver and the first IPv4 answer wins.
pub async fn resolve_address(host: &str) -> Result<String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| Error::Protocol(format!("Failed to resolve {}: {}", host, e)))?;

    let ip = addrs
        .map(|addr: SocketAddr| addr.ip())
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| Error::Protocol(format!("No IPv4 address for {}", host)))?;

    debug!("Resolved {} to {}", host, ip);
    Ok(ip.to_string())
}

/// IPv4 address of this machine, found by resolving its hostname.
pub async fn local_address() -> Result<String> {
    let name = hostname::get()
        .map_err(|e| Error::Protocol(format!("Failed to read hostname: {}", e)))?;
    resolve_address(&name.to_string_lossy()).await
}
