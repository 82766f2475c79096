//! Caching host resolution shared by every outbound connection.
//!
//! # Components
//!
//! - [`ResolutionCache`] - hostname → address/failure map, optionally
//!   persisted as a snapshot file between runs
//! - [`ResolverPool`] - fixed set of workers answering [`ResolverHandle::resolve`]
//!   requests from the cache or a live [`HostLookup`]
//! - [`ResolvingConnector`] - plugs the pool into the HTTP client so no
//!   connection bypasses the cache
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hostfetch::resolver::{ResolutionCache, ResolverConfig, ResolverPool, SystemLookup};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ResolutionCache::new());
//! let pool = ResolverPool::spawn(cache, Arc::new(SystemLookup), ResolverConfig::default());
//! let addr = pool.handle().resolve("example.com").await?;
//! println!("example.com -> {addr}");
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod connector;
mod error;
mod lookup;
mod pool;
mod snapshot;
mod warm;

pub use cache::{CacheSummary, ResolutionCache, ResolutionEntry};
pub use connector::ResolvingConnector;
pub use error::{ResolveError, SnapshotError};
pub use lookup::{HostLookup, SystemLookup};
pub use pool::{
    DEFAULT_RESOLVE_TIMEOUT, DEFAULT_RESOLVER_WORKERS, ResolutionRequest, ResolverConfig,
    ResolverHandle, ResolverPool,
};
pub use warm::{WarmSummary, warm_cache};
