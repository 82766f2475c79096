//! The transport seam between host workers and the network.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

use super::error::DownloadError;

/// Response headers were received; the body is still on the wire.
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body chunks in arrival order.
    pub body: BoxStream<'static, Result<Bytes, DownloadError>>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Issues a GET for a URL and hands back the streaming response.
///
/// Implementations must dial through the resolver pool; the production one
/// is [`HttpClient`](super::HttpClient).
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Starts fetching `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when no response headers could be obtained.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, DownloadError>;
}
