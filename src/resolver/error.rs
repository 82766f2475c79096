//! Error types for host resolution and cache persistence.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned to callers of the resolver pool.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The lookup failed (now or earlier in this cache lifetime).
    #[error("cannot resolve {host}: {reason}")]
    Failed {
        /// Host that failed to resolve.
        host: String,
        /// Recorded failure description.
        reason: String,
    },

    /// No reply arrived before the requester deadline.
    #[error("resolving {host} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Host being resolved.
        host: String,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// The pool has shut down and accepts no more requests.
    #[error("resolver pool closed while resolving {host}")]
    PoolClosed {
        /// Host being resolved.
        host: String,
    },

    /// The worker handling the request faulted before replying.
    #[error("resolver worker faulted while resolving {host}")]
    WorkerFault {
        /// Host being resolved.
        host: String,
    },

    /// A `host:port` authority could not be split.
    #[error("invalid network address '{authority}'")]
    InvalidAuthority {
        /// The rejected authority string.
        authority: String,
    },
}

impl ResolveError {
    /// Creates a lookup failure error.
    pub fn failed(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Returns the host this error refers to, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Failed { host, .. }
            | Self::Timeout { host, .. }
            | Self::PoolClosed { host }
            | Self::WorkerFault { host } => Some(host),
            Self::InvalidAuthority { .. } => None,
        }
    }
}

/// Errors reading or writing a resolution cache snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem I/O failed.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// Snapshot file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// File does not start with the snapshot magic header.
    #[error("{path} is not a resolution cache snapshot")]
    InvalidFormat {
        /// Snapshot file path.
        path: PathBuf,
    },

    /// Payload could not be encoded or decoded.
    #[error("snapshot payload error at {path}: {source}")]
    Payload {
        /// Snapshot file path.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a payload (de)serialization error.
    pub fn payload(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Payload {
            path: path.into(),
            source,
        }
    }
}
