//! Reading the URL source and waiting for every job it produced.
//!
//! The [`Controller`] parses lines, routes valid URLs to their host workers
//! and counts outstanding jobs. [`Controller::finish`] returns only after the
//! count is back to zero, forwarding each job's report to a [`ReportSink`].

mod controller;
mod report;

pub use controller::{Controller, HttpsPolicy, LineOutcome, RunSummary};
pub use report::{LineSink, ReportSink};
