//! Per-host serialized downloading.
//!
//! Every URL becomes a [`DownloadJob`] routed through the [`DispatchTable`]
//! to the single worker owning its host. The worker fetches through a
//! [`Fetch`] implementation, hashes the body incrementally, and sends one
//! [`JobReport`] per job.
//!
//! # Features
//!
//! - At most one in-flight request per host, FIFO per host
//! - All hosts proceed concurrently
//! - Streaming SHA-256 of `200` bodies; other bodies drained and discarded
//! - Faulted workers deregister themselves and hand queued jobs to a
//!   replacement
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hostfetch::download::{ClientTimeouts, DispatchTable, DownloadJob, HttpClient};
//! use hostfetch::resolver::{ResolutionCache, ResolverConfig, ResolverPool, ResolvingConnector, SystemLookup};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ResolverPool::spawn(
//!     Arc::new(ResolutionCache::new()),
//!     Arc::new(SystemLookup),
//!     ResolverConfig::default(),
//! );
//! let client = HttpClient::new(ResolvingConnector::new(pool.handle()), ClientTimeouts::default())?;
//! let (reports_tx, mut reports) = mpsc::unbounded_channel();
//! let table = DispatchTable::new(Arc::new(client), reports_tx);
//!
//! table.route(DownloadJob::new("http://example.com/".parse()?, "example.com"))?;
//! if let Some(report) = reports.recv().await {
//!     println!("{} {}", report.url, report.result);
//! }
//! table.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod dispatch;
mod error;
mod fetch;
mod result;
mod worker;

pub use client::{ClientTimeouts, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use dispatch::{DispatchTable, RouteError, WorkerState};
pub use error::DownloadError;
pub use fetch::{Fetch, FetchResponse};
pub use result::{BodyHasher, ContentDigest, DownloadJob, DownloadResult, JobReport};
