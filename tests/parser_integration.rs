//! Integration tests for input line parsing.
//!
//! These run realistic URL lists through `parse_url_line` the way the
//! controller reads them.

use hostfetch::{ParseError, parse_url_line};

#[test]
fn test_mixed_url_list() {
    let input = "\
# crawl seed, 2024-05
http://a.example/1
https://A.Example/2?q=x

ftp://files.example/pub
not a url
http://[::1]:8080/local
http://10.0.0.7/raw
";

    let mut hosts = Vec::new();
    let mut rejected = Vec::new();
    for line in input.lines() {
        match parse_url_line(line) {
            Ok(Some(parsed)) => hosts.push(parsed.host().to_string()),
            Ok(None) => {}
            Err(e) => rejected.push(e),
        }
    }

    assert_eq!(hosts, ["a.example", "a.example", "[::1]", "10.0.0.7"]);
    assert_eq!(rejected.len(), 2);
    assert!(matches!(rejected[0], ParseError::UnsupportedScheme { .. }));
    assert!(matches!(rejected[1], ParseError::InvalidUrl { .. }));
}

#[test]
fn test_same_host_different_ports_share_a_host_key() {
    let a = parse_url_line("http://a.example:8080/x").unwrap().unwrap();
    let b = parse_url_line("http://a.example/y").unwrap().unwrap();
    assert_eq!(a.host(), b.host());
    assert_eq!(a.url().port(), Some(8080));
}

#[test]
fn test_https_flag_and_whitespace() {
    let parsed = parse_url_line("   https://secure.example/doc.pdf\t").unwrap().unwrap();
    assert!(parsed.is_https());
    assert_eq!(parsed.url().as_str(), "https://secure.example/doc.pdf");
}

#[test]
fn test_overlong_line_is_rejected() {
    let line = format!("http://a.example/{}", "x".repeat(2100));
    let err = parse_url_line(&line).unwrap_err();
    assert!(matches!(err, ParseError::UrlTooLong { .. }));
    assert!(err.to_string().contains("max 2000"));
}
