//! Error types for the download module.
//!
//! Everything that can go wrong between "dial" and "last body byte" for a
//! single job. HTTP status codes are not errors here; they are a normal
//! [`DownloadResult`](super::DownloadResult) outcome.

use std::error::Error as StdError;

use thiserror::Error;

use crate::resolver::ResolveError;

/// Transport-level failures of a single download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, TLS or protocol failure reported by the HTTP client.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read deadline exceeded.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The host could not be resolved through the resolver pool.
    #[error("cannot resolve host for {url}: {source}")]
    Resolution {
        /// The URL whose host failed to resolve.
        url: String,
        /// The resolver's verdict.
        #[source]
        source: ResolveError,
    },

    /// The response body stream failed after headers were received.
    #[error("error reading body of {url}: {reason}")]
    Body {
        /// The URL whose body was being read.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a resolution error.
    pub fn resolution(url: impl Into<String>, source: ResolveError) -> Self {
        Self::Resolution {
            url: url.into(),
            source,
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Body {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Classifies a reqwest error for `url`.
    ///
    /// Resolution failures raised by the resolving connector are buried in
    /// the client's error chain; they are lifted out so callers can tell an
    /// unresolvable host from a refused connection.
    #[must_use]
    pub fn from_reqwest(url: impl Into<String>, error: reqwest::Error) -> Self {
        let url = url.into();
        if let Some(resolve) = find_resolve_error(&error) {
            return Self::resolution(url, resolve.clone());
        }
        if error.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, error)
        }
    }

    /// Returns true when the job failed before any connection was attempted.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}

fn find_resolve_error(error: &reqwest::Error) -> Option<&ResolveError> {
    let mut current: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(resolve) = err.downcast_ref::<ResolveError>() {
            return Some(resolve);
        }
        current = err.source();
    }
    None
}
