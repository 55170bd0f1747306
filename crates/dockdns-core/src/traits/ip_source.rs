// # IP Source Trait
//
// Defines the interface for determining this host's public IPv4 address,
// the target of every created A record.
//
// ## Implementations
//
// - HTTP fallback chain with explicit override: `dockdns-ip-http` crate

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP source implementations
///
/// The address is resolved once at startup; the sync engine does not
/// follow address changes.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The public IPv4 address
    /// - `Err(Error)`: If unable to determine it
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
