//! Reporter configuration, built from defaults or environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::metrics::OperationFilter;
use crate::report::{Provenance, ReportFormatKind, DEFAULT_REPORT_PATH};

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Report file, truncated on every publish
    pub output_path: PathBuf,
    pub format: ReportFormatKind,
    pub provenance: Provenance,
    /// Which operations produce records
    pub filter: OperationFilter,
    /// Tag every record with `Service` and `Operation` dimensions
    pub call_dimensions: bool,
    /// Mirror the report to stdout
    pub echo_stdout: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_REPORT_PATH),
            format: ReportFormatKind::default(),
            provenance: Provenance::default(),
            filter: OperationFilter::All,
            call_dimensions: false,
            echo_stdout: true,
        }
    }
}

impl ReporterConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_path: env::var("PERF_RESULTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            format: env::var("PERF_REPORT_FORMAT")
                .ok()
                .and_then(|v| match v.parse::<ReportFormatKind>() {
                    Ok(kind) => Some(kind),
                    Err(e) => {
                        warn!("PERF_REPORT_FORMAT ignored: {e}");
                        None
                    }
                })
                .unwrap_or(defaults.format),
            provenance: Provenance {
                product_id: env::var("PERF_PRODUCT_ID")
                    .unwrap_or(defaults.provenance.product_id),
                sdk_version: env::var("PERF_SDK_VERSION")
                    .unwrap_or(defaults.provenance.sdk_version),
                commit_id: env::var("PERF_COMMIT_ID")
                    .unwrap_or(defaults.provenance.commit_id),
            },
            filter: env::var("PERF_OPERATIONS")
                .map(|v| OperationFilter::parse(&v))
                .unwrap_or(defaults.filter),
            call_dimensions: env_bool("PERF_CALL_DIMENSIONS", defaults.call_dimensions),
            echo_stdout: env_bool("PERF_ECHO_STDOUT", defaults.echo_stdout),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_format(mut self, format: ReportFormatKind) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: OperationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_call_dimensions(mut self, enabled: bool) -> Self {
        self.call_dimensions = enabled;
        self
    }

    pub fn with_echo_stdout(mut self, enabled: bool) -> Self {
        self.echo_stdout = enabled;
        self
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
