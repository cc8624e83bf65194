//! JSON report publishing.
//!
//! A report is rendered once from the full record list and written to two
//! sinks: the console (for capture by a parent runner) and a file. A failure
//! on one sink is logged and does not stop the other. An empty record list
//! produces no output at all.

pub mod format;

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::ReporterConfig;
use crate::error::{ReportError, Result};
use crate::metrics::MetricRecord;

pub use format::{
    BenchmarkFormat, CompactFormat, Provenance, ReportFormat, ReportFormatKind,
};

/// Default output file, relative to the working directory.
pub const DEFAULT_REPORT_PATH: &str = "perf-results.json";

/// What a publish attempt actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing was recorded, so nothing was written
    Empty,
    /// The report had already been flushed earlier
    AlreadyFlushed,
    /// Console and file both written
    Written { path: PathBuf },
    /// Console written, file could not be
    ConsoleOnly,
    /// File written, console could not be
    FileOnly { path: PathBuf },
}

pub struct JsonReporter {
    format: Box<dyn ReportFormat>,
    path: PathBuf,
    echo_stdout: bool,
}

impl JsonReporter {
    pub fn new(format: Box<dyn ReportFormat>, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
            echo_stdout: true,
        }
    }

    pub fn from_config(config: &ReporterConfig) -> Self {
        Self {
            format: config.format.build(config.provenance.clone()),
            path: config.output_path.clone(),
            echo_stdout: config.echo_stdout,
        }
    }

    /// Disable the console echo; the file is still written.
    pub fn quiet(mut self) -> Self {
        self.echo_stdout = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_kind(&self) -> ReportFormatKind {
        self.format.kind()
    }

    /// Render the report, or `None` when there is nothing to report.
    pub fn render(&self, records: &[MetricRecord]) -> Result<Option<String>> {
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.format.render(records)?))
    }

    /// Publish to stdout (unless quiet) and to the report file.
    pub fn publish(&self, records: &[MetricRecord]) -> Result<PublishOutcome> {
        if self.echo_stdout {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            self.publish_to(records, &mut lock)
        } else {
            self.publish_to(records, &mut std::io::sink())
        }
    }

    /// Publish with `console` standing in for stdout.
    pub fn publish_to<W: Write>(
        &self,
        records: &[MetricRecord],
        console: &mut W,
    ) -> Result<PublishOutcome> {
        let Some(text) = self.render(records)? else {
            debug!("no metrics recorded, skipping report");
            return Ok(PublishOutcome::Empty);
        };

        // Console first: it is the output a parent runner depends on.
        let console_result = writeln!(console, "{text}").and_then(|()| console.flush());
        let file_result = write_report_file(&self.path, &text);

        match (console_result, file_result) {
            (Ok(()), Ok(())) => {
                info!(
                    path = %self.path.display(),
                    records = records.len(),
                    format = %self.format.kind(),
                    "performance report written"
                );
                Ok(PublishOutcome::Written {
                    path: self.path.clone(),
                })
            }
            (Ok(()), Err(e)) => {
                warn!("{e}");
                Ok(PublishOutcome::ConsoleOnly)
            }
            (Err(e), Ok(())) => {
                warn!(path = %self.path.display(), "report not echoed to console: {e}");
                Ok(PublishOutcome::FileOnly {
                    path: self.path.clone(),
                })
            }
            (Err(console_err), Err(file_err)) => {
                warn!("{file_err}");
                Err(ReportError::Console(console_err))
            }
        }
    }
}

/// Truncate-create `path` and write the whole document in one go.
fn write_report_file(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricRecord;

    fn reporter(dir: &Path) -> JsonReporter {
        JsonReporter::new(
            ReportFormatKind::Benchmark.build(Provenance::default()),
            dir.join("perf-results.json"),
        )
    }

    #[test]
    fn empty_records_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = reporter(dir.path());
        let mut console = Vec::new();

        let outcome = reporter.publish_to(&[], &mut console).unwrap();

        assert_eq!(outcome, PublishOutcome::Empty);
        assert!(console.is_empty());
        assert!(!reporter.path().exists());
    }

    #[test]
    fn console_and_file_carry_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = reporter(dir.path());
        let mut console = Vec::new();
        let records = vec![MetricRecord::latency("S3", "GetObject", 5.0, true)];

        let outcome = reporter.publish_to(&records, &mut console).unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::Written {
                path: reporter.path().to_path_buf()
            }
        );
        let file = std::fs::read_to_string(reporter.path()).unwrap();
        let console = String::from_utf8(console).unwrap();
        assert_eq!(console.trim_end(), file);
    }

    #[test]
    fn unwritable_path_still_prints_console() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonReporter::new(
            Box::new(CompactFormat),
            dir.path().join("missing").join("perf-results.json"),
        );
        let mut console = Vec::new();
        let records = vec![MetricRecord::latency("S3", "PutObject", 1.0, true)];

        let outcome = reporter.publish_to(&records, &mut console).unwrap();

        assert_eq!(outcome, PublishOutcome::ConsoleOnly);
        assert!(String::from_utf8(console).unwrap().contains("perf-results"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_console_still_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = reporter(dir.path());
        let records = vec![MetricRecord::latency("S3", "PutObject", 1.0, true)];

        let outcome = reporter.publish_to(&records, &mut BrokenPipe).unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::FileOnly {
                path: reporter.path().to_path_buf()
            }
        );
        let text = std::fs::read_to_string(reporter.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn both_sinks_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonReporter::new(
            Box::new(CompactFormat),
            dir.path().join("missing").join("perf-results.json"),
        );
        let records = vec![MetricRecord::latency("S3", "PutObject", 1.0, true)];

        let err = reporter.publish_to(&records, &mut BrokenPipe).unwrap_err();

        assert!(matches!(err, ReportError::Console(_)));
    }

    #[test]
    fn existing_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = reporter(dir.path());
        std::fs::write(reporter.path(), "x".repeat(64 * 1024)).unwrap();
        let records = vec![MetricRecord::latency("S3", "PutObject", 1.0, true)];

        reporter.publish_to(&records, &mut std::io::sink()).unwrap();

        let text = std::fs::read_to_string(reporter.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["results"].as_array().unwrap().len(), 1);
    }
}
