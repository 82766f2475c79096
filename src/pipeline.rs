//! One complete download run: cache → resolver pool → HTTP client →
//! dispatch table → controller, and back to the snapshot file.

use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::config::{ConfigError, DownloaderConfig};
use crate::download::{DispatchTable, HttpClient};
use crate::ingest::{Controller, ReportSink, RunSummary};
use crate::resolver::{CacheSummary, HostLookup, ResolutionCache, ResolverPool, ResolvingConnector};

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Per-job totals.
    pub jobs: RunSummary,
    /// Resolution cache contents at the end of the run.
    pub cache: CacheSummary,
}

/// Loads the configured snapshot, or starts an empty cache.
///
/// # Errors
///
/// Returns [`ConfigError::Snapshot`] when a snapshot exists but cannot be
/// read or decoded.
pub fn open_cache(config: &DownloaderConfig) -> Result<ResolutionCache, ConfigError> {
    let Some(path) = config.snapshot_path.as_deref() else {
        return Ok(ResolutionCache::new());
    };
    let cache = ResolutionCache::load_snapshot(path)?;
    log_cache_summary("loaded", &cache);
    Ok(cache)
}

/// Logs the cache's ok/failed counts, then every cached failure.
pub fn log_cache_summary(stage: &str, cache: &ResolutionCache) {
    let summary = cache.summary();
    info!(
        stage,
        total = summary.total,
        ok = summary.ok,
        failed = summary.failed,
        "resolution cache"
    );
    for (host, reason) in cache.failures() {
        info!(host = %host, reason = %reason, "cached resolution failure");
    }
}

/// Downloads every URL read from `input`, reporting each job to `sink`.
///
/// All jobs routed before an input read error still run to completion; the
/// snapshot (if configured) is saved before the function returns.
///
/// # Errors
///
/// Returns [`ConfigError`] for invalid settings, an unreadable snapshot, a
/// failed snapshot save, or an input read error.
#[instrument(skip_all, fields(resolvers = config.resolver_workers))]
pub async fn run<R, S>(
    config: &DownloaderConfig,
    lookup: Arc<dyn HostLookup>,
    input: R,
    sink: &mut S,
) -> Result<RunOutcome, ConfigError>
where
    R: AsyncBufRead + Unpin,
    S: ReportSink,
{
    config.validate()?;
    let cache = Arc::new(open_cache(config)?);
    let pool = ResolverPool::spawn(Arc::clone(&cache), lookup, config.resolver());

    let client = match HttpClient::new(ResolvingConnector::new(pool.handle()), config.timeouts()) {
        Ok(client) => client,
        Err(e) => {
            pool.shutdown().await;
            return Err(ConfigError::HttpClient(e));
        }
    };

    let (reports_tx, reports_rx) = mpsc::unbounded_channel();
    let dispatch = DispatchTable::new(Arc::new(client), reports_tx);
    let mut controller = Controller::new(dispatch, reports_rx, config.https_policy);

    let read_result = controller.run_reader(input, sink).await;
    if let Err(e) = &read_result {
        error!(error = %e, "input read failed; finishing routed jobs");
    }
    let jobs = controller.finish(sink).await;
    pool.shutdown().await;

    if let Some(path) = config.snapshot_path.as_deref() {
        log_cache_summary("final", &cache);
        cache.save_snapshot(path)?;
    }
    if jobs.malformed > 0 {
        warn!(malformed = jobs.malformed, "some input lines were skipped");
    }

    read_result.map_err(ConfigError::InputRead)?;
    Ok(RunOutcome {
        jobs,
        cache: cache.summary(),
    })
}
