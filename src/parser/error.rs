//! Error types for URL line parsing.

use thiserror::Error;

/// Maximum URL length to accept (standard browser limit).
/// URLs longer than this are rejected to prevent memory issues.
pub const MAX_URL_LENGTH: usize = 2000;

/// Errors that can occur while turning an input line into a download job.
///
/// Every variant is recoverable: the controller logs the line and moves on.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// URL could not be parsed at all.
    #[error("malformed URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input line.
        url: String,
        /// Why the URL is invalid.
        reason: String,
    },

    /// URL parsed but uses a scheme other than http/https.
    #[error("unsupported scheme '{scheme}' in URL '{url}'")]
    UnsupportedScheme {
        /// The offending input line.
        url: String,
        /// The rejected scheme.
        scheme: String,
    },

    /// URL parsed but has no host to dispatch on.
    #[error("URL has no host: '{url}'")]
    MissingHost {
        /// The offending input line.
        url: String,
    },

    /// URL exceeds maximum allowed length
    #[error("URL too long ({length} chars, max {max}): {url_preview}...")]
    UrlTooLong {
        /// Truncated URL for display
        url_preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },
}

impl ParseError {
    /// Creates an `InvalidUrl` error for a malformed URL.
    #[must_use]
    pub fn malformed(url: &str, parse_error: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: parse_error.to_string(),
        }
    }

    /// Creates an `UnsupportedScheme` error.
    #[must_use]
    pub fn unsupported_scheme(url: &str, scheme: &str) -> Self {
        Self::UnsupportedScheme {
            url: url.to_string(),
            scheme: scheme.to_string(),
        }
    }

    /// Creates a `MissingHost` error.
    #[must_use]
    pub fn no_host(url: &str) -> Self {
        Self::MissingHost {
            url: url.to_string(),
        }
    }

    /// Creates a `UrlTooLong` error for URLs exceeding the maximum length.
    #[must_use]
    pub fn too_long(url: &str) -> Self {
        Self::UrlTooLong {
            url_preview: url.chars().take(50).collect(),
            length: url.len(),
            max: MAX_URL_LENGTH,
        }
    }
}
