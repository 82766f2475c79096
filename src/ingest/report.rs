//! Output sinks for per-job results.

use std::io::Write;

use tracing::warn;

use crate::download::JobReport;

/// Receives every finished job, in completion order.
pub trait ReportSink {
    /// Records one finished job.
    fn record(&mut self, report: &JobReport);
}

/// Collects reports in memory.
impl ReportSink for Vec<JobReport> {
    fn record(&mut self, report: &JobReport) {
        self.push(report.clone());
    }
}

/// Writes one `"<url> <outcome>"` line per job.
///
/// Outcomes render as `sha256:<hex>`, `http:<status>`, `err:<description>`
/// or `panic:<description>`.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    out: W,
    failed_writes: usize,
}

impl<W: Write> LineSink<W> {
    /// Wraps `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            failed_writes: 0,
        }
    }

    /// Number of lines that could not be written.
    #[must_use]
    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for LineSink<W> {
    fn record(&mut self, report: &JobReport) {
        if let Err(e) = writeln!(self.out, "{} {}", report.url, report.result) {
            self.failed_writes += 1;
            if self.failed_writes == 1 {
                warn!(error = %e, "cannot write job result");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;
    use crate::download::{ContentDigest, DownloadResult};

    fn report(url: &str, result: DownloadResult) -> JobReport {
        let url = Url::parse(url).unwrap();
        JobReport {
            host: url.host_str().unwrap().to_string(),
            url,
            result,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_line_sink_formats_each_outcome() {
        let mut sink = LineSink::new(Vec::new());
        sink.record(&report(
            "http://a.example/1",
            DownloadResult::Success(ContentDigest::of(b"")),
        ));
        sink.record(&report("http://a.example/2", DownloadResult::HttpError(503)));
        sink.record(&report(
            "http://b.example/1",
            DownloadResult::TransportError("no such host".into()),
        ));
        sink.record(&report(
            "http://c.example/1",
            DownloadResult::PanicError("boom".into()),
        ));

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "http://a.example/1 sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
                "http://a.example/2 http:503",
                "http://b.example/1 err:no such host",
                "http://c.example/1 panic:boom",
            ]
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_line_sink_counts_failed_writes() {
        let mut sink = LineSink::new(BrokenPipe);
        sink.record(&report("http://a.example/1", DownloadResult::HttpError(404)));
        sink.record(&report("http://a.example/2", DownloadResult::HttpError(404)));
        assert_eq!(sink.failed_writes(), 2);
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<JobReport> = Vec::new();
        sink.record(&report("http://a.example/1", DownloadResult::HttpError(404)));
        assert_eq!(sink.len(), 1);
    }
}
