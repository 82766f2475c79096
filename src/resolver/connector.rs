//! Dial-time address substitution for the HTTP client.
//!
//! [`ResolvingConnector`] is installed as the HTTP client's DNS resolver, so
//! every outbound connection obtains its address from the resolver pool.
//! A failed resolution aborts the connection attempt; there is no fallback to
//! the operating system resolver.

use std::net::{IpAddr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::debug;

use super::error::ResolveError;
use super::pool::{ResolverHandle, parse_ip_literal};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connector that resolves hostnames through a [`ResolverHandle`].
#[derive(Debug, Clone)]
pub struct ResolvingConnector {
    resolver: ResolverHandle,
}

impl ResolvingConnector {
    /// Creates a connector backed by `resolver`.
    #[must_use]
    pub fn new(resolver: ResolverHandle) -> Self {
        Self { resolver }
    }

    /// Resolves a bare host name (or IP literal) to an address.
    ///
    /// # Errors
    ///
    /// Propagates the pool's [`ResolveError`].
    pub async fn resolve_host(&self, host: &str) -> Result<IpAddr, ResolveError> {
        if let Some(ip) = parse_ip_literal(host) {
            debug!(host = %host, "literal address, dialing unchanged");
            return Ok(ip);
        }
        let ip = self.resolver.resolve(host).await?;
        debug!(host = %host, addr = %ip, "dial address substituted");
        Ok(ip)
    }

    /// Turns a `host:port` network address into the socket address to dial.
    ///
    /// IPv6 literals must be bracketed (`[::1]:80`).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidAuthority`] when `authority` has no
    /// valid port, or the pool's error when the host cannot be resolved.
    pub async fn dial_target(&self, authority: &str) -> Result<SocketAddr, ResolveError> {
        let (host, port) = split_host_port(authority)?;
        let ip = self.resolve_host(host).await?;
        Ok(SocketAddr::new(ip, port))
    }
}

impl Resolve for ResolvingConnector {
    fn resolve(&self, name: Name) -> Resolving {
        let connector = self.clone();
        Box::pin(async move {
            let ip = connector
                .resolve_host(name.as_str())
                .await
                .map_err(BoxError::from)?;
            // Port 0 is replaced by the connector with the URL's port.
            let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
            Ok::<_, BoxError>(addrs)
        })
    }
}

fn split_host_port(authority: &str) -> Result<(&str, u16), ResolveError> {
    let invalid = || ResolveError::InvalidAuthority {
        authority: authority.to_string(),
    };

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        (host, after.strip_prefix(':').ok_or_else(invalid)?)
    } else {
        let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
        if host.contains(':') {
            return Err(invalid());
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::resolver::{HostLookup, ResolutionCache, ResolverConfig, ResolverPool};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HostLookup for CountingLookup {
        async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match host {
                "a.example" => Ok(vec!["10.0.0.1".parse().unwrap()]),
                _ => Err(io::Error::new(io::ErrorKind::NotFound, "no such host")),
            }
        }
    }

    fn pool_with_counter() -> (ResolverPool, Arc<CountingLookup>) {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let pool = ResolverPool::spawn(
            Arc::new(ResolutionCache::new()),
            Arc::clone(&lookup) as Arc<dyn HostLookup>,
            ResolverConfig {
                workers: 1,
                request_timeout: Duration::from_secs(5),
                lookup_timeout: Duration::from_secs(5),
            },
        );
        (pool, lookup)
    }

    #[tokio::test]
    async fn test_dial_target_substitutes_resolved_address() {
        let (pool, lookup) = pool_with_counter();
        let connector = ResolvingConnector::new(pool.handle());

        let addr = connector.dial_target("a.example:8080").await.unwrap();
        assert_eq!(addr, "10.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_dial_target_literal_ip_unchanged() {
        let (pool, lookup) = pool_with_counter();
        let connector = ResolvingConnector::new(pool.handle());

        let v4 = connector.dial_target("192.0.2.1:80").await.unwrap();
        let v6 = connector.dial_target("[2001:db8::1]:443").await.unwrap();
        assert_eq!(v4, "192.0.2.1:80".parse::<SocketAddr>().unwrap());
        assert_eq!(v6, "[2001:db8::1]:443".parse::<SocketAddr>().unwrap());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_dial_target_propagates_resolution_failure() {
        let (pool, _lookup) = pool_with_counter();
        let connector = ResolvingConnector::new(pool.handle());

        let err = connector.dial_target("b.example:80").await.unwrap_err();
        assert!(matches!(err, ResolveError::Failed { .. }), "{err:?}");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_reqwest_resolve_hook_uses_pool() {
        let (pool, lookup) = pool_with_counter();
        let connector = ResolvingConnector::new(pool.handle());

        let name: Name = "a.example".parse().unwrap();
        let addrs: Vec<SocketAddr> = Resolve::resolve(&connector, name).await.unwrap().collect();
        assert_eq!(addrs, vec!["10.0.0.1:0".parse::<SocketAddr>().unwrap()]);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        pool.shutdown().await;
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("a.example:80").unwrap(), ("a.example", 80));
        assert_eq!(split_host_port("[::1]:8080").unwrap(), ("::1", 8080));
        assert!(split_host_port("a.example").is_err());
        assert!(split_host_port(":80").is_err());
        assert!(split_host_port("a.example:http").is_err());
        assert!(split_host_port("::1:80").is_err());
        assert!(split_host_port("[::1]80").is_err());
    }
}
