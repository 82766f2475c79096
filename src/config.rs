//! Runtime configuration for a download run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::download::{CONNECT_TIMEOUT_SECS, ClientTimeouts, READ_TIMEOUT_SECS};
use crate::ingest::HttpsPolicy;
use crate::resolver::{DEFAULT_RESOLVE_TIMEOUT, DEFAULT_RESOLVER_WORKERS, ResolverConfig, SnapshotError};

/// Upper bound on resolver pool size.
pub const MAX_RESOLVER_WORKERS: usize = 64;

/// Startup errors. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Resolver pool size outside `1..=MAX_RESOLVER_WORKERS`.
    #[error("resolver workers must be between 1 and {max}, got {0}", max = MAX_RESOLVER_WORKERS)]
    ResolverWorkers(usize),

    /// A timeout was configured as zero.
    #[error("{name} must be greater than zero")]
    ZeroTimeout {
        /// Which timeout.
        name: &'static str,
    },

    /// The URL source could not be opened.
    #[error("cannot open input {path}: {source}")]
    Input {
        /// The input path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL source failed mid-read.
    #[error("error reading input: {0}")]
    InputRead(#[source] std::io::Error),

    /// The HTTP client could not be built.
    #[error(transparent)]
    HttpClient(crate::download::DownloadError),

    /// The resolution snapshot could not be loaded or saved.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Settings for one download run, after CLI and file layers are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Resolver pool size.
    pub resolver_workers: usize,
    /// Deadline for one resolution request.
    pub resolve_timeout: Duration,
    /// HTTP connect deadline.
    pub connect_timeout: Duration,
    /// HTTP request deadline, body included.
    pub read_timeout: Duration,
    /// Whether `https` URLs are downloaded.
    pub https_policy: HttpsPolicy,
    /// Where the resolution cache is loaded from and saved to.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            resolver_workers: DEFAULT_RESOLVER_WORKERS,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            https_policy: HttpsPolicy::default(),
            snapshot_path: None,
        }
    }
}

impl DownloaderConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RESOLVER_WORKERS).contains(&self.resolver_workers) {
            return Err(ConfigError::ResolverWorkers(self.resolver_workers));
        }
        for (name, value) in [
            ("resolve timeout", self.resolve_timeout),
            ("connect timeout", self.connect_timeout),
            ("read timeout", self.read_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout { name });
            }
        }
        Ok(())
    }

    /// Resolver pool settings.
    #[must_use]
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            workers: self.resolver_workers,
            request_timeout: self.resolve_timeout,
            lookup_timeout: self.resolve_timeout,
        }
    }

    /// HTTP client deadlines.
    #[must_use]
    pub fn timeouts(&self) -> ClientTimeouts {
        ClientTimeouts {
            connect: self.connect_timeout,
            read: self.read_timeout,
        }
    }
}
