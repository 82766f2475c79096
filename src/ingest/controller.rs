//! Ingestion and completion accounting.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::report::ReportSink;
use crate::download::{DispatchTable, DownloadJob, DownloadResult, JobReport};
use crate::parser::parse_url_line;

/// What to do with `https` URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpsPolicy {
    /// Download them like `http` URLs.
    #[default]
    Process,
    /// Log and skip them.
    Skip,
}

/// How a single input line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// A job was routed to its host worker.
    Routed,
    /// Blank or comment line.
    Ignored,
    /// The line is not a valid http(s) URL.
    Malformed,
    /// Valid, but excluded by [`HttpsPolicy::Skip`].
    Skipped,
    /// Valid, but no worker could take it.
    Unroutable,
}

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs handed to host workers.
    pub routed: usize,
    /// Jobs that ended with a body digest.
    pub succeeded: usize,
    /// Jobs that ended with a non-200 status.
    pub http_errors: usize,
    /// Jobs that failed to resolve, connect or read.
    pub transport_errors: usize,
    /// Jobs that faulted inside their worker.
    pub panics: usize,
    /// Input lines rejected by the parser.
    pub malformed: usize,
    /// URLs skipped by the https policy.
    pub skipped: usize,
    /// Valid URLs no worker accepted.
    pub unroutable: usize,
}

impl RunSummary {
    /// Jobs that reported completion, whatever the outcome.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.succeeded + self.http_errors + self.transport_errors + self.panics
    }

    fn count(&mut self, result: &DownloadResult) {
        match result {
            DownloadResult::Success(_) => self.succeeded += 1,
            DownloadResult::HttpError(_) => self.http_errors += 1,
            DownloadResult::TransportError(_) => self.transport_errors += 1,
            DownloadResult::PanicError(_) => self.panics += 1,
        }
    }
}

/// Feeds input lines to the dispatch table and waits for every routed job.
///
/// The controller only tracks completion, not success: a host that fails
/// every job still completes its jobs.
#[derive(Debug)]
pub struct Controller {
    dispatch: Arc<DispatchTable>,
    reports: mpsc::UnboundedReceiver<JobReport>,
    policy: HttpsPolicy,
    outstanding: usize,
    summary: RunSummary,
}

impl Controller {
    /// Creates a controller routing into `dispatch`.
    ///
    /// `reports` must be the receiving end of the channel the table's
    /// workers report to.
    #[must_use]
    pub fn new(
        dispatch: Arc<DispatchTable>,
        reports: mpsc::UnboundedReceiver<JobReport>,
        policy: HttpsPolicy,
    ) -> Self {
        Self {
            dispatch,
            reports,
            policy,
            outstanding: 0,
            summary: RunSummary::default(),
        }
    }

    /// Jobs routed but not yet reported.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Parses and routes one input line.
    ///
    /// Reports that have already arrived are forwarded to `sink` on the way.
    pub fn ingest_line(&mut self, line: &str, sink: &mut impl ReportSink) -> LineOutcome {
        let outcome = self.route_line(line);
        self.forward_ready(sink);
        outcome
    }

    /// Ingests every line of `reader`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that stopped reading. Lines read before the
    /// error stay routed; call [`finish`](Self::finish) regardless.
    #[instrument(skip_all)]
    pub async fn run_reader<R>(&mut self, reader: R, sink: &mut impl ReportSink) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            self.ingest_line(&line, sink);
        }
        debug!(routed = self.summary.routed, "input exhausted");
        Ok(())
    }

    /// Ingests every line of `lines`.
    pub fn run_lines<I, S>(&mut self, lines: I, sink: &mut impl ReportSink)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.ingest_line(line.as_ref(), sink);
        }
    }

    /// Waits until every routed job has reported, then shuts the workers down.
    #[instrument(skip_all, fields(outstanding = self.outstanding))]
    pub async fn finish(mut self, sink: &mut impl ReportSink) -> RunSummary {
        info!(outstanding = self.outstanding, "input done; waiting for jobs");
        while self.outstanding > 0 {
            if let Some(report) = self.reports.recv().await {
                self.complete(&report, sink);
            } else {
                error!(
                    outstanding = self.outstanding,
                    "report channel closed with jobs outstanding"
                );
                break;
            }
        }
        self.dispatch.shutdown().await;

        let summary = self.summary;
        info!(
            routed = summary.routed,
            ok = summary.succeeded,
            http_errors = summary.http_errors,
            transport_errors = summary.transport_errors,
            panics = summary.panics,
            malformed = summary.malformed,
            skipped = summary.skipped,
            "all jobs complete"
        );
        summary
    }

    fn route_line(&mut self, line: &str) -> LineOutcome {
        let parsed = match parse_url_line(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return LineOutcome::Ignored,
            Err(e) => {
                warn!(error = %e, "skipping malformed line");
                self.summary.malformed += 1;
                return LineOutcome::Malformed;
            }
        };

        if parsed.is_https() && self.policy == HttpsPolicy::Skip {
            debug!(url = %parsed.url(), "skipping https url");
            self.summary.skipped += 1;
            return LineOutcome::Skipped;
        }

        let (url, host) = parsed.into_parts();
        match self.dispatch.route(DownloadJob::new(url, host)) {
            Ok(()) => {
                self.outstanding += 1;
                self.summary.routed += 1;
                LineOutcome::Routed
            }
            Err(e) => {
                error!(error = %e, "job not routed");
                self.summary.unroutable += 1;
                LineOutcome::Unroutable
            }
        }
    }

    fn forward_ready(&mut self, sink: &mut impl ReportSink) {
        while self.outstanding > 0 {
            match self.reports.try_recv() {
                Ok(report) => self.complete(&report, sink),
                Err(_) => break,
            }
        }
    }

    fn complete(&mut self, report: &JobReport, sink: &mut impl ReportSink) {
        self.outstanding -= 1;
        self.summary.count(&report.result);
        sink.record(report);
        if self.outstanding == 0 {
            debug!("no jobs outstanding");
        }
    }
}
