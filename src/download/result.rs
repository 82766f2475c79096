//! Jobs, outcomes and the report each worker sends per finished job.

use std::fmt;
use std::time::Duration;

use sha2::{Digest, Sha256};
use url::Url;

/// One URL submitted to a host worker. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    url: Url,
    host: String,
}

impl DownloadJob {
    /// Creates a job for `url`, served by the worker of `host`.
    #[must_use]
    pub fn new(url: Url, host: impl Into<String>) -> Self {
        Self {
            url,
            host: host.into(),
        }
    }

    /// The URL to fetch.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The lower-cased host that owns this job.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// SHA-256 digest of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest of a complete in-memory body.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = BodyHasher::new();
        hasher.update(bytes);
        hasher.finish()
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental body hasher; fed one chunk at a time.
#[derive(Clone, Default)]
pub struct BodyHasher {
    inner: Sha256,
    bytes: u64,
}

impl fmt::Debug for BodyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyHasher")
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

impl BodyHasher {
    /// Starts an empty digest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next body chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Completes the digest.
    #[must_use]
    pub fn finish(self) -> ContentDigest {
        ContentDigest(self.inner.finalize().into())
    }
}

/// Outcome of a single download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// Status 200; the body hashed to this digest.
    Success(ContentDigest),
    /// Any non-200 status. The body was drained and discarded.
    HttpError(u16),
    /// Dial, resolution, connect or read failure.
    TransportError(String),
    /// The job faulted inside the worker.
    PanicError(String),
}

impl DownloadResult {
    /// Returns true for [`DownloadResult::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(digest) => write!(f, "sha256:{digest}"),
            Self::HttpError(status) => write!(f, "http:{status}"),
            Self::TransportError(desc) => write!(f, "err:{desc}"),
            Self::PanicError(desc) => write!(f, "panic:{desc}"),
        }
    }
}

/// Completion signal for one job: what ran, where, and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// The URL the job fetched.
    pub url: Url,
    /// The host whose worker ran the job.
    pub host: String,
    /// The outcome.
    pub result: DownloadResult,
    /// Wall time spent on the job.
    pub elapsed: Duration,
}
