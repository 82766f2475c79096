//! hostfetch core library
//!
//! Downloads an unbounded list of URLs as fast as possible while never
//! running more than one request per host at a time, and never resolving a
//! hostname twice, even across runs.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Validation of input lines as http(s) URLs
//! - [`resolver`] - Resolution cache, resolver pool and the connector that
//!   routes every HTTP connection through them
//! - [`download`] - Per-host workers, the dispatch table and the HTTP client
//! - [`ingest`] - Input reading, completion accounting and result sinks
//! - [`pipeline`] - One full run wired end to end
//! - [`sample`] - Per-host reservoir sampling of URL lists
//! - [`config`] - Runtime settings and startup errors

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::any::Any;

pub mod config;
pub mod download;
pub mod ingest;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod sample;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, DownloaderConfig};
pub use download::{ContentDigest, DispatchTable, DownloadResult, HttpClient, JobReport};
pub use ingest::{Controller, HttpsPolicy, LineSink, ReportSink, RunSummary};
pub use parser::{ParseError, ParsedUrl, parse_url_line};
pub use pipeline::{RunOutcome, run};
pub use resolver::{ResolutionCache, ResolutionEntry, ResolverPool, SystemLookup};
pub use sample::HostSampler;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
