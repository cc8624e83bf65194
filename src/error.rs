//! Error types for report publishing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while rendering or publishing a report.
///
/// Lifecycle hooks never surface these; only an explicit `flush` does.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to console: {0}")]
    Console(#[source] std::io::Error),

    #[error("failed to write report file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown report format: {0}")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
