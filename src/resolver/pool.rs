//! Fixed-size pool of resolver workers behind a request/response interface.
//!
//! Callers hold a cheap, cloneable [`ResolverHandle`]. Each call sends a
//! [`ResolutionRequest`] carrying a single-use reply channel onto a queue
//! shared by all workers; whichever worker picks it up consults the cache,
//! performs a live lookup on a miss, and replies exactly once.
//!
//! # Concurrency Model
//!
//! - Workers are independent Tokio tasks; a slow lookup only stalls the
//!   worker running it
//! - The request queue is one `mpsc` channel whose receiver is shared
//!   behind a `tokio::sync::Mutex`
//! - A request's deadline starts when a worker takes it, so time spent
//!   queued behind other hosts never fails a request
//! - Live lookups run under their own deadline; requests whose caller has
//!   gone away are dropped unanswered

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::cache::{ResolutionCache, ResolutionEntry};
use super::error::ResolveError;
use super::lookup::HostLookup;
use crate::panic_message;

/// Default number of resolver workers.
pub const DEFAULT_RESOLVER_WORKERS: usize = 4;

/// Default deadline for a single resolution request.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Queue slots per worker before requesters wait to enqueue.
const QUEUE_DEPTH_PER_WORKER: usize = 64;

/// Resolver pool sizing and deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Number of workers (at least 1).
    pub workers: usize,
    /// How long a requester waits for the reply once a worker has taken
    /// its request.
    pub request_timeout: Duration,
    /// Deadline for one live lookup; a lookup that misses it is cached as a
    /// failure.
    pub lookup_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_RESOLVER_WORKERS,
            request_timeout: DEFAULT_RESOLVE_TIMEOUT,
            lookup_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// A hostname plus its private reply channels.
#[derive(Debug)]
pub struct ResolutionRequest {
    host: String,
    accepted: oneshot::Sender<()>,
    reply: oneshot::Sender<ResolutionEntry>,
}

type SharedRequests = Arc<Mutex<mpsc::Receiver<ResolutionRequest>>>;

/// Owner of the resolver workers.
#[derive(Debug)]
pub struct ResolverPool {
    requests: mpsc::Sender<ResolutionRequest>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    cache: Arc<ResolutionCache>,
    request_timeout: Duration,
}

impl ResolverPool {
    /// Spawns `config.workers` workers sharing `cache` and `lookup`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    #[instrument(level = "debug", skip(cache, lookup))]
    pub fn spawn(
        cache: Arc<ResolutionCache>,
        lookup: Arc<dyn HostLookup>,
        config: ResolverConfig,
    ) -> Self {
        let worker_count = config.workers.max(1);
        let (requests, receiver) = mpsc::channel(worker_count * QUEUE_DEPTH_PER_WORKER);
        let receiver: SharedRequests = Arc::new(Mutex::new(receiver));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let workers = (0..worker_count)
            .map(|id| {
                let worker = ResolverWorker {
                    id,
                    requests: Arc::clone(&receiver),
                    shutdown: shutdown_rx.clone(),
                    cache: Arc::clone(&cache),
                    lookup: Arc::clone(&lookup),
                    lookup_timeout: config.lookup_timeout,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        debug!(workers = worker_count, "resolver pool started");

        Self {
            requests,
            shutdown,
            workers,
            cache,
            request_timeout: config.request_timeout,
        }
    }

    /// Returns a handle for submitting resolution requests.
    #[must_use]
    pub fn handle(&self) -> ResolverHandle {
        ResolverHandle {
            requests: self.requests.clone(),
            timeout: self.request_timeout,
        }
    }

    /// The cache the workers populate.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Number of running workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops all workers and waits for them to exit.
    ///
    /// Requests still queued are dropped and their requesters observe
    /// [`ResolveError::PoolClosed`].
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        drop(self.requests);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "resolver worker ended abnormally");
            }
        }
        debug!("resolver pool stopped");
    }
}

/// Cloneable requester side of a [`ResolverPool`].
#[derive(Debug, Clone)]
pub struct ResolverHandle {
    requests: mpsc::Sender<ResolutionRequest>,
    timeout: Duration,
}

impl ResolverHandle {
    /// Resolves `host` to a single address.
    ///
    /// IP literals (bracketed IPv6 included) are returned without a round
    /// trip to the pool.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Failed`] when the lookup failed (now or earlier)
    /// - [`ResolveError::Timeout`] when no reply arrives within the deadline
    ///   after a worker has taken the request
    /// - [`ResolveError::WorkerFault`] when the worker faulted before replying
    /// - [`ResolveError::PoolClosed`] when the pool has shut down, or shuts
    ///   down while the request is still queued
    pub async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        let (accepted, taken) = oneshot::channel();
        let (reply, response) = oneshot::channel();
        let request = ResolutionRequest {
            host: host.to_string(),
            accepted,
            reply,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| ResolveError::PoolClosed {
                host: host.to_string(),
            })?;

        // Queue wait is unbounded; the deadline covers only the worker's turn.
        taken.await.map_err(|_| ResolveError::PoolClosed {
            host: host.to_string(),
        })?;

        let entry = tokio::time::timeout(self.timeout, response)
            .await
            .map_err(|_| ResolveError::Timeout {
                host: host.to_string(),
                after: self.timeout,
            })?
            .map_err(|_| ResolveError::WorkerFault {
                host: host.to_string(),
            })?;

        match entry {
            ResolutionEntry::Address(ip) => Ok(ip),
            ResolutionEntry::Failed(reason) => Err(ResolveError::failed(host, reason)),
        }
    }
}

/// Parses `host` as an IP literal, accepting `[v6]` brackets.
pub(crate) fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse().ok()
}

struct ResolverWorker {
    id: usize,
    requests: SharedRequests,
    shutdown: watch::Receiver<bool>,
    cache: Arc<ResolutionCache>,
    lookup: Arc<dyn HostLookup>,
    lookup_timeout: Duration,
}

impl ResolverWorker {
    async fn run(mut self) {
        loop {
            let next = {
                let mut requests = self.requests.lock().await;
                tokio::select! {
                    biased;
                    _ = self.shutdown.changed() => None,
                    request = requests.recv() => request,
                }
            };
            let Some(request) = next else {
                break;
            };

            let ResolutionRequest {
                host,
                accepted,
                reply,
            } = request;
            if reply.is_closed() || accepted.send(()).is_err() {
                debug!(worker = self.id, host = %host, "requester gone; skipping");
                continue;
            }

            let outcome = std::panic::AssertUnwindSafe(self.answer(&host))
                .catch_unwind()
                .await;
            match outcome {
                Ok(entry) => {
                    // Requester may have timed out and gone away.
                    let _ = reply.send(entry);
                }
                Err(panic) => {
                    warn!(
                        worker = self.id,
                        host = %host,
                        panic = %panic_message(panic.as_ref()),
                        "resolver worker faulted; dropping request"
                    );
                }
            }
        }
        debug!(worker = self.id, "resolver worker exiting");
    }

    async fn answer(&self, host: &str) -> ResolutionEntry {
        if let Some(entry) = self.cache.lookup(host) {
            debug!(worker = self.id, host = %host, entry = %entry, "resolution cache hit");
            return entry;
        }

        let entry = match tokio::time::timeout(self.lookup_timeout, self.lookup.lookup(host)).await
        {
            Ok(Ok(addrs)) => match addrs.first() {
                Some(addr) => {
                    info!(host = %host, addr = %addr, "resolved");
                    ResolutionEntry::Address(*addr)
                }
                None => {
                    warn!(host = %host, "empty DNS response");
                    ResolutionEntry::Failed(format!("empty DNS response for {host}"))
                }
            },
            Ok(Err(e)) => {
                warn!(host = %host, error = %e, "resolving failed");
                ResolutionEntry::Failed(e.to_string())
            }
            Err(_) => {
                warn!(host = %host, timeout_ms = self.lookup_timeout.as_millis(), "lookup timed out");
                ResolutionEntry::Failed(format!(
                    "lookup timed out after {}ms",
                    self.lookup_timeout.as_millis()
                ))
            }
        };

        self.cache.store(host, entry)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Fake lookup with a fixed table; counts live lookups per call.
    #[derive(Default)]
    struct TableLookup {
        table: HashMap<String, Vec<IpAddr>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl TableLookup {
        /// `addrs` is a comma-separated address list; empty means no records.
        fn with(entries: &[(&str, &str)]) -> Self {
            let table = entries
                .iter()
                .map(|(host, addrs)| {
                    let addrs = addrs
                        .split(',')
                        .filter(|a| !a.is_empty())
                        .map(|a| a.parse::<IpAddr>().unwrap())
                        .collect();
                    ((*host).to_string(), addrs)
                })
                .collect();
            Self {
                table,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HostLookup for TableLookup {
        async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if host == "boom.example" {
                panic!("lookup exploded");
            }
            self.table
                .get(host)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
        }
    }

    fn spawn_pool(lookup: Arc<TableLookup>, workers: usize) -> ResolverPool {
        ResolverPool::spawn(
            Arc::new(ResolutionCache::new()),
            lookup,
            ResolverConfig {
                workers,
                request_timeout: Duration::from_secs(5),
                lookup_timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn test_resolve_takes_first_address() {
        let lookup = Arc::new(TableLookup::with(&[("a.example", "10.0.0.1,10.0.0.2")]));
        let pool = spawn_pool(Arc::clone(&lookup), 2);

        let ip = pool.handle().resolve("a.example").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(
            pool.cache().lookup("a.example"),
            Some(ResolutionEntry::Address(ip))
        );
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_resolve_is_served_from_cache() {
        let lookup = Arc::new(TableLookup::with(&[("a.example", "10.0.0.1")]));
        let pool = spawn_pool(Arc::clone(&lookup), 1);
        let handle = pool.handle();

        handle.resolve("a.example").await.unwrap();
        handle.resolve("a.example").await.unwrap();
        handle.resolve("A.EXAMPLE").await.unwrap();

        assert_eq!(lookup.calls(), 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_is_cached_and_not_retried() {
        let lookup = Arc::new(TableLookup::default());
        let pool = spawn_pool(Arc::clone(&lookup), 1);
        let handle = pool.handle();

        let first = handle.resolve("b.example").await.unwrap_err();
        let second = handle.resolve("b.example").await.unwrap_err();

        assert!(matches!(first, ResolveError::Failed { .. }));
        assert!(matches!(second, ResolveError::Failed { .. }));
        assert_eq!(lookup.calls(), 1);
        assert!(pool.cache().lookup("b.example").unwrap().is_failed());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_response_is_failure() {
        let lookup = Arc::new(TableLookup::with(&[("empty.example", "")]));
        let pool = spawn_pool(Arc::clone(&lookup), 1);

        let err = pool.handle().resolve("empty.example").await.unwrap_err();
        assert!(err.to_string().contains("empty DNS response"), "{err}");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_ip_literal_skips_pool() {
        let lookup = Arc::new(TableLookup::default());
        let pool = spawn_pool(Arc::clone(&lookup), 1);
        let handle = pool.handle();

        assert_eq!(
            handle.resolve("192.0.2.7").await.unwrap(),
            "192.0.2.7".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            handle.resolve("[::1]").await.unwrap(),
            "::1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(lookup.calls(), 0);
        assert!(pool.cache().is_empty());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_misses_observe_one_value() {
        let mut lookup = TableLookup::with(&[("race.example", "10.0.0.9")]);
        lookup.delay = Duration::from_millis(20);
        let lookup = Arc::new(lookup);
        let pool = spawn_pool(Arc::clone(&lookup), 4);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let handle = pool.handle();
            tasks.push(tokio::spawn(
                async move { handle.resolve("race.example").await },
            ));
        }
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }

        let stored = pool.cache().lookup("race.example").unwrap();
        assert!(results.iter().all(|ip| Some(*ip) == stored.address()));
        assert_eq!(pool.cache().len(), 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_fault_replies_with_error_and_pool_survives() {
        let lookup = Arc::new(TableLookup::with(&[("a.example", "10.0.0.1")]));
        let pool = spawn_pool(Arc::clone(&lookup), 1);
        let handle = pool.handle();

        let err = handle.resolve("boom.example").await.unwrap_err();
        assert!(matches!(err, ResolveError::WorkerFault { .. }), "{err:?}");

        // The single worker keeps serving after the fault.
        assert!(handle.resolve("a.example").await.is_ok());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_requester_deadline() {
        let mut lookup = TableLookup::with(&[("slow.example", "10.0.0.1")]);
        lookup.delay = Duration::from_millis(500);
        let pool = ResolverPool::spawn(
            Arc::new(ResolutionCache::new()),
            Arc::new(lookup),
            ResolverConfig {
                workers: 1,
                request_timeout: Duration::from_millis(50),
                lookup_timeout: Duration::from_secs(2),
            },
        );

        let err = pool.handle().resolve("slow.example").await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout { .. }), "{err:?}");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_queue_wait_does_not_count_against_deadline() {
        let hosts: Vec<String> = (0..10).map(|i| format!("h{i}.example")).collect();
        let entries: Vec<(&str, &str)> = hosts.iter().map(|h| (h.as_str(), "10.0.0.1")).collect();
        let mut lookup = TableLookup::with(&entries);
        lookup.delay = Duration::from_millis(30);
        let lookup = Arc::new(lookup);
        let pool = ResolverPool::spawn(
            Arc::new(ResolutionCache::new()),
            Arc::clone(&lookup) as Arc<dyn HostLookup>,
            ResolverConfig {
                workers: 1,
                request_timeout: Duration::from_millis(100),
                lookup_timeout: Duration::from_secs(2),
            },
        );

        // Ten lookups back to back take ~300ms on one worker, well past the
        // per-request deadline; each request only waits on its own lookup.
        let mut tasks = Vec::new();
        for host in &hosts {
            let handle = pool.handle();
            let host = host.clone();
            tasks.push(tokio::spawn(async move { handle.resolve(&host).await }));
        }
        for task in tasks {
            let result = task.await.unwrap();
            assert!(result.is_ok(), "{result:?}");
        }
        assert_eq!(lookup.calls(), 10);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_abandoned_request_is_skipped() {
        let mut lookup = TableLookup::with(&[
            ("a.example", "10.0.0.1"),
            ("b.example", "10.0.0.2"),
            ("c.example", "10.0.0.3"),
        ]);
        lookup.delay = Duration::from_millis(100);
        let lookup = Arc::new(lookup);
        let pool = spawn_pool(Arc::clone(&lookup), 1);

        // The single worker is busy with a.example while b.example queues.
        let handle = pool.handle();
        let first = tokio::spawn(async move { handle.resolve("a.example").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let handle = pool.handle();
        let abandoned = tokio::spawn(async move { handle.resolve("b.example").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());

        assert!(first.await.unwrap().is_ok());
        assert!(pool.handle().resolve("c.example").await.is_ok());

        assert_eq!(lookup.calls(), 2);
        assert!(pool.cache().lookup("b.example").is_none());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_resolve_after_shutdown_fails() {
        let lookup = Arc::new(TableLookup::with(&[("a.example", "10.0.0.1")]));
        let pool = spawn_pool(lookup, 2);
        let handle = pool.handle();
        pool.shutdown().await;

        let err = handle.resolve("a.example").await.unwrap_err();
        assert!(matches!(err, ResolveError::PoolClosed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_zero_workers_is_clamped_to_one() {
        let pool = spawn_pool(Arc::new(TableLookup::default()), 0);
        assert_eq!(pool.worker_count(), 1);
        pool.shutdown().await;
    }

    #[test]
    fn test_parse_ip_literal() {
        assert!(parse_ip_literal("10.0.0.1").is_some());
        assert!(parse_ip_literal("[2001:db8::1]").is_some());
        assert!(parse_ip_literal("2001:db8::1").is_some());
        assert!(parse_ip_literal("a.example").is_none());
        assert!(parse_ip_literal("[a.example]").is_none());
    }
}
