//! Input parsing: one absolute http(s) URL per line.
//!
//! Malformed lines are reported as [`ParseError`] values so the caller can
//! log and skip them; nothing in this module is fatal.

mod error;
mod url;

pub use error::{MAX_URL_LENGTH, ParseError};
pub use url::{ParsedUrl, parse_url_line};
