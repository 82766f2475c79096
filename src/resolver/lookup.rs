//! Forward lookup seam used by resolver workers on a cache miss.

use std::io;
use std::net::IpAddr;

use async_trait::async_trait;

/// Performs a live forward lookup of a hostname.
///
/// Implementations return every address the lookup produced, in the order
/// the underlying resolver returned them. Only the first one is ever used.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Resolves `host` to its addresses.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the lookup fails.
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Lookup through the operating system resolver (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_lookup_localhost() {
        let addrs = SystemLookup.lookup("localhost").await.unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(IpAddr::is_loopback));
    }

    #[tokio::test]
    async fn test_system_lookup_ip_literal() {
        let addrs = SystemLookup.lookup("127.0.0.1").await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }
}
