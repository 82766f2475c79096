//! Per-host download worker.
//!
//! A worker owns the job queue of exactly one host and processes it one job
//! at a time. Dropping the worker (queue closed, fault, or task cancelled)
//! always deregisters it from the [`DispatchTable`].

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Instant;

use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::dispatch::DispatchTable;
use super::fetch::{Fetch, FetchResponse};
use super::result::{BodyHasher, DownloadJob, DownloadResult, JobReport};
use crate::panic_message;

/// What every worker needs besides its queue.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) fetcher: Arc<dyn Fetch>,
    pub(crate) reports: mpsc::UnboundedSender<JobReport>,
}

pub(crate) struct HostWorker {
    host: String,
    generation: u64,
    jobs: mpsc::UnboundedReceiver<DownloadJob>,
    table: Weak<DispatchTable>,
    context: WorkerContext,
    started: bool,
}

impl HostWorker {
    pub(crate) fn new(
        host: String,
        generation: u64,
        jobs: mpsc::UnboundedReceiver<DownloadJob>,
        table: Weak<DispatchTable>,
        context: WorkerContext,
    ) -> Self {
        Self {
            host,
            generation,
            jobs,
            table,
            context,
            started: false,
        }
    }

    /// Processes jobs in arrival order until the queue closes or a job faults.
    #[instrument(skip(self), fields(host = %self.host, generation = self.generation))]
    pub(crate) async fn run(mut self) {
        self.started = true;
        debug!("host worker started");
        while let Some(job) = self.jobs.recv().await {
            let started = Instant::now();
            let outcome = AssertUnwindSafe(download(self.context.fetcher.as_ref(), job.url()))
                .catch_unwind()
                .await;

            let (result, faulted) = match outcome {
                Ok(result) => (result, false),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(url = %job.url(), panic = %message, "job faulted; retiring host worker");
                    (DownloadResult::PanicError(message), true)
                }
            };

            debug!(url = %job.url(), result = %result, "job finished");
            let report = JobReport {
                url: job.url().clone(),
                host: self.host.clone(),
                result,
                elapsed: started.elapsed(),
            };
            if self.context.reports.send(report).is_err() {
                warn!("report channel closed; result dropped");
            }

            if faulted {
                break;
            }
        }
        debug!("host worker stopped");
    }
}

impl Drop for HostWorker {
    fn drop(&mut self) {
        // Never polled: the runtime is discarding the task while shutting down.
        if !self.started {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.retire(&self.host, self.generation, &mut self.jobs);
        }
    }
}

/// Fetches `url`, hashing a 200 body and draining any other.
pub(crate) async fn download(fetcher: &dyn Fetch, url: &Url) -> DownloadResult {
    let FetchResponse { status, mut body } = match fetcher.fetch(url).await {
        Ok(response) => response,
        Err(e) => return DownloadResult::TransportError(e.to_string()),
    };

    if status != 200 {
        // The connection is only reusable once the body is consumed.
        while let Some(chunk) = body.next().await {
            if let Err(e) = chunk {
                debug!(url = %url, error = %e, "error draining discarded body");
                break;
            }
        }
        return DownloadResult::HttpError(status);
    }

    let mut hasher = BodyHasher::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => hasher.update(&bytes),
            Err(e) => return DownloadResult::TransportError(e.to_string()),
        }
    }
    debug!(url = %url, bytes = hasher.bytes(), "body hashed");
    DownloadResult::Success(hasher.finish())
}
