//! Host dispatch table.
//!
//! Maps each host to the single worker allowed to download from it. Workers
//! are created lazily on the first job for a host and replaced automatically
//! when they die, so a host is never locked out.
//!
//! # Invariants
//!
//! - At most one live worker per host. Check-and-create in [`DispatchTable::route`]
//!   runs under the map's per-entry lock.
//! - Jobs for one host are processed in routing order, including jobs that
//!   were queued behind a faulted worker and handed to its replacement.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fetch::Fetch;
use super::result::{DownloadJob, JobReport};
use super::worker::{HostWorker, WorkerContext};

/// Lifecycle state of a registered host worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// The worker is accepting jobs.
    Active,
    /// The worker's queue is closed; the next job for the host replaces it.
    Dead,
}

/// Routing failed without a worker to accept the job.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A freshly spawned worker refused the job (runtime shutting down).
    #[error("no worker available for host {host}")]
    WorkerUnavailable {
        /// The host the job was routed to.
        host: String,
    },
}

struct WorkerHandle {
    generation: u64,
    jobs: mpsc::UnboundedSender<DownloadJob>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    fn state(&self) -> WorkerState {
        if self.jobs.is_closed() {
            WorkerState::Dead
        } else {
            WorkerState::Active
        }
    }
}

/// Registry of per-host download workers.
///
/// Shared as `Arc<DispatchTable>`: workers hold a weak reference back to it
/// so they can deregister themselves when they stop.
pub struct DispatchTable {
    workers: DashMap<String, WorkerHandle>,
    next_generation: AtomicU64,
    spawned: AtomicUsize,
    runtime: Handle,
    context: WorkerContext,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("workers", &self.workers.len())
            .field("spawned", &self.spawned.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DispatchTable {
    /// Creates an empty table whose workers fetch with `fetcher` and send one
    /// [`JobReport`] per finished job to `reports`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetch>, reports: mpsc::UnboundedSender<JobReport>) -> Arc<Self> {
        Arc::new(Self {
            workers: DashMap::new(),
            next_generation: AtomicU64::new(1),
            spawned: AtomicUsize::new(0),
            runtime: Handle::current(),
            context: WorkerContext { fetcher, reports },
        })
    }

    /// Hands `job` to its host's worker, creating the worker if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::WorkerUnavailable`] only when a brand-new
    /// worker cannot accept the job, which happens while the runtime shuts
    /// down.
    pub fn route(self: &Arc<Self>, job: DownloadJob) -> Result<(), RouteError> {
        let host = job.host().to_string();
        let mut job = job;
        loop {
            match self.workers.entry(host.clone()) {
                Entry::Occupied(mut occupied) => {
                    if occupied.get().state() == WorkerState::Dead {
                        debug!(host = %host, "replacing dead host worker");
                        occupied.insert(self.spawn_worker(&host));
                    }
                    let sent = occupied.get().jobs.send(job);
                    match sent {
                        Ok(()) => return Ok(()),
                        Err(mpsc::error::SendError(returned)) => {
                            // Queue closed between the state check and the send.
                            job = returned;
                            occupied.remove();
                        }
                    }
                }
                Entry::Vacant(vacant) => {
                    let handle = self.spawn_worker(&host);
                    let sent = handle.jobs.send(job);
                    vacant.insert(handle);
                    return sent.map_err(|_| RouteError::WorkerUnavailable { host });
                }
            }
        }
    }

    /// Deregisters the worker `generation` of `host` and closes its queue.
    ///
    /// Jobs still queued are moved, in order, to a fresh worker. Runs under
    /// the host's entry lock, so no job can slip into the closing queue.
    pub(crate) fn retire(
        self: &Arc<Self>,
        host: &str,
        generation: u64,
        jobs: &mut mpsc::UnboundedReceiver<DownloadJob>,
    ) {
        let entry = self.workers.entry(host.to_string());
        jobs.close();
        let mut pending = Vec::new();
        while let Ok(job) = jobs.try_recv() {
            pending.push(job);
        }

        match entry {
            Entry::Occupied(mut occupied) if occupied.get().generation == generation => {
                if pending.is_empty() {
                    occupied.remove();
                    debug!(host = %host, generation, "host worker deregistered");
                } else {
                    info!(host = %host, pending = pending.len(), "handing queued jobs to replacement worker");
                    occupied.insert(self.spawn_with_backlog(host, pending));
                }
            }
            Entry::Occupied(occupied) => {
                // A newer worker already owns the host.
                for job in pending {
                    if let Err(mpsc::error::SendError(job)) = occupied.get().jobs.send(job) {
                        warn!(host = %host, url = %job.url(), "replacement worker gone; job dropped");
                    }
                }
            }
            Entry::Vacant(vacant) => {
                if !pending.is_empty() {
                    vacant.insert(self.spawn_with_backlog(host, pending));
                }
            }
        }
    }

    /// Lifecycle state of the worker registered for `host`, if any.
    #[must_use]
    pub fn state(&self, host: &str) -> Option<WorkerState> {
        self.workers.get(host).map(|handle| handle.state())
    }

    /// Number of registered workers still accepting jobs.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|handle| handle.state() == WorkerState::Active)
            .count()
    }

    /// Total number of workers spawned over the table's lifetime.
    #[must_use]
    pub fn workers_spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Closes every queue and waits for the workers to finish what they hold.
    pub async fn shutdown(&self) {
        loop {
            let hosts: Vec<String> = self.workers.iter().map(|e| e.key().clone()).collect();
            if hosts.is_empty() {
                break;
            }
            for host in hosts {
                if let Some((_, handle)) = self.workers.remove(&host) {
                    let WorkerHandle { jobs, task, .. } = handle;
                    drop(jobs);
                    if let Err(e) = task.await {
                        warn!(host = %host, error = %e, "host worker task ended abnormally");
                    }
                }
            }
        }
        debug!(spawned = self.workers_spawned(), "dispatch table shut down");
    }

    fn spawn_worker(self: &Arc<Self>, host: &str) -> WorkerHandle {
        self.spawn_with_backlog(host, Vec::new())
    }

    fn spawn_with_backlog(self: &Arc<Self>, host: &str, backlog: Vec<DownloadJob>) -> WorkerHandle {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        for job in backlog {
            // The receiver is alive in this scope.
            let _ = tx.send(job);
        }
        let worker = HostWorker::new(
            host.to_string(),
            generation,
            rx,
            Arc::downgrade(self),
            self.context.clone(),
        );
        let task = self.runtime.spawn(worker.run());
        self.spawned.fetch_add(1, Ordering::SeqCst);
        debug!(host = %host, generation, "host worker spawned");
        WorkerHandle {
            generation,
            jobs: tx,
            task,
        }
    }
}
