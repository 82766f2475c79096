//! HTTP client wrapper used by host workers.
//!
//! This module provides the `HttpClient` struct which issues streaming GET
//! requests with timeout configuration, and routes every connection through
//! the [`ResolvingConnector`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::fetch::{Fetch, FetchResponse};
use crate::resolver::ResolvingConnector;
use crate::user_agent;

/// Connect and read deadlines for outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// Deadline for establishing the TCP/TLS connection.
    pub connect: Duration,
    /// Deadline for the whole request, body included.
    pub read: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for streaming downloads.
///
/// Created once and shared by every host worker so connections are pooled.
/// Proxies are disabled: a proxy would dial the origin itself and bypass the
/// resolution cache.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hostfetch::download::{ClientTimeouts, Fetch, HttpClient};
/// use hostfetch::resolver::{ResolutionCache, ResolverConfig, ResolverPool, ResolvingConnector, SystemLookup};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = ResolverPool::spawn(
///     Arc::new(ResolutionCache::new()),
///     Arc::new(SystemLookup),
///     ResolverConfig::default(),
/// );
/// let client = HttpClient::new(ResolvingConnector::new(pool.handle()), ClientTimeouts::default())?;
/// let response = client.fetch(&"http://example.com/".parse()?).await?;
/// println!("status {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client that resolves hosts through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    #[instrument(level = "debug", skip(connector))]
    pub fn new(connector: ResolvingConnector, timeouts: ClientTimeouts) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read)
            .user_agent(user_agent::default_user_agent())
            .no_proxy()
            .dns_resolver(Arc::new(connector))
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url.as_str(), e))?;

        let status = response.status().as_u16();
        debug!(status, "response headers received");

        let body_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| {
                    if e.is_timeout() {
                        DownloadError::timeout(body_url.as_str())
                    } else {
                        DownloadError::body(body_url.as_str(), e.to_string())
                    }
                })
            })
            .boxed();

        Ok(FetchResponse { status, body })
    }
}
