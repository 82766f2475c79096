//! Validation of a single input line as a downloadable URL.

use tracing::trace;
use url::Url;

use super::error::{MAX_URL_LENGTH, ParseError};

/// A validated, absolute http(s) URL together with its dispatch key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    url: Url,
    host: String,
}

impl ParsedUrl {
    /// The parsed URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lower-cased host name (or IP literal) the URL targets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the URL uses the `https` scheme.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Consumes the value, returning the URL and host.
    #[must_use]
    pub fn into_parts(self) -> (Url, String) {
        (self.url, self.host)
    }
}

/// Parses one line of input into a [`ParsedUrl`].
///
/// Returns `Ok(None)` for lines that carry no job at all (blank lines and
/// `#` comments), so callers can skip them without logging.
///
/// # Validation rules
/// - Must not exceed `MAX_URL_LENGTH` (2000 chars)
/// - Must be parseable by the `url` crate
/// - Must use http or https scheme
/// - Must have a host (domain or IP)
///
/// # Errors
///
/// Returns [`ParseError`] describing why the line was rejected.
///
/// # Examples
///
/// ```
/// use hostfetch::parser::parse_url_line;
///
/// let parsed = parse_url_line("http://Example.COM/a").unwrap().unwrap();
/// assert_eq!(parsed.host(), "example.com");
/// assert!(parse_url_line("   ").unwrap().is_none());
/// assert!(parse_url_line("ftp://example.com/").is_err());
/// ```
pub fn parse_url_line(line: &str) -> Result<Option<ParsedUrl>, ParseError> {
    let raw = line.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return Ok(None);
    }

    // Check URL length first (prevents memory issues with very long URLs)
    if raw.len() > MAX_URL_LENGTH {
        return Err(ParseError::too_long(raw));
    }

    let url = Url::parse(raw).map_err(|e| ParseError::malformed(raw, &e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ParseError::unsupported_scheme(raw, scheme)),
    }

    // `url` lower-cases domains already; IPv6 literals keep their brackets here.
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return Err(ParseError::no_host(raw)),
    };

    trace!(url = %url, host = %host, "parsed URL line");
    Ok(Some(ParsedUrl { url, host }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_url() {
        let parsed = parse_url_line("http://example.com/file.pdf").unwrap().unwrap();
        assert_eq!(parsed.url().as_str(), "http://example.com/file.pdf");
        assert_eq!(parsed.host(), "example.com");
        assert!(!parsed.is_https());
    }

    #[test]
    fn test_parse_https_url() {
        let parsed = parse_url_line("https://example.com/paper.pdf").unwrap().unwrap();
        assert!(parsed.is_https());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let parsed = parse_url_line("  http://example.com/x \r").unwrap().unwrap();
        assert_eq!(parsed.url().as_str(), "http://example.com/x");
    }

    #[test]
    fn test_parse_host_is_lowercased() {
        let parsed = parse_url_line("http://WWW.Example.ORG/Path").unwrap().unwrap();
        assert_eq!(parsed.host(), "www.example.org");
        // Path case is preserved
        assert_eq!(parsed.url().path(), "/Path");
    }

    #[test]
    fn test_parse_port_is_not_part_of_host() {
        let parsed = parse_url_line("http://example.com:8080/x").unwrap().unwrap();
        assert_eq!(parsed.host(), "example.com");
    }

    #[test]
    fn test_parse_ip_literal_host() {
        let parsed = parse_url_line("http://10.0.0.1/x").unwrap().unwrap();
        assert_eq!(parsed.host(), "10.0.0.1");
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert!(parse_url_line("").unwrap().is_none());
        assert!(parse_url_line("   \t").unwrap().is_none());
        assert!(parse_url_line("# a comment").unwrap().is_none());
    }

    #[test]
    fn test_rejects_relative_url() {
        let err = parse_url_line("/just/a/path").unwrap_err();
        assert!(matches!(err, ParseError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_ftp() {
        let err = parse_url_line("ftp://files.example.com/file.pdf").unwrap_err();
        match err {
            ParseError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "ftp"),
            other => panic!("expected UnsupportedScheme, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_mailto() {
        assert!(parse_url_line("mailto:user@example.com").is_err());
    }

    #[test]
    fn test_rejects_too_long() {
        let long_url = format!("http://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        let err = parse_url_line(&long_url).unwrap_err();
        assert!(matches!(err, ParseError::UrlTooLong { .. }));
    }
}
