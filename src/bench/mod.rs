//! Object-store latency benchmark.
//!
//! Runs a matrix of `(object size, bucket type)` scenarios against a
//! simulated object store, routing every call through a [`dispatch::CallDispatcher`]
//! so that registered monitors observe it.

pub mod dispatch;
pub mod runner;
pub mod store;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use dispatch::CallDispatcher;
pub use runner::{run, RunSummary, ScenarioResult};
pub use store::{LatencyModel, SimulatedObjectStore, StoreError, Timed};

/// Service name reported to monitors.
pub const SERVICE_NAME: &str = "S3";

/// Operations recorded by default; the rest are setup and cleanup.
pub const BENCHMARKED_OPERATIONS: [&str; 2] = ["PutObject", "GetObject"];

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid benchmark config: {0}")]
    InvalidConfig(String),

    #[error("unknown bucket type: {0}")]
    UnknownBucketType(String),

    #[error("invalid size label: {0}")]
    InvalidSize(String),
}

// ─── Scenario matrix ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketType {
    Standard,
    /// Single-zone directory bucket
    Express,
}

impl BucketType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "s3-standard",
            Self::Express => "s3-express",
        }
    }
}

impl FromStr for BucketType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "s3-standard" | "standard" => Ok(Self::Standard),
            "s3-express" | "express" => Ok(Self::Express),
            other => Err(BenchError::UnknownBucketType(other.to_string())),
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One benchmark case: upload then download an object of `size_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub size_label: String,
    pub size_bytes: usize,
    pub bucket_type: BucketType,
}

impl Scenario {
    pub fn new(size_label: &str, bucket_type: BucketType) -> Result<Self, BenchError> {
        Ok(Self {
            size_bytes: parse_size(size_label)?,
            size_label: size_label.trim().to_string(),
            bucket_type,
        })
    }
}

/// {8KB, 64KB, 1MB} × {standard, express}
pub fn default_matrix() -> Vec<Scenario> {
    matrix(&["8KB", "64KB", "1MB"], &[BucketType::Standard, BucketType::Express])
        .unwrap_or_default()
}

/// Every bucket type crossed with every size, bucket type outermost.
pub fn matrix(sizes: &[&str], bucket_types: &[BucketType]) -> Result<Vec<Scenario>, BenchError> {
    let mut out = Vec::with_capacity(sizes.len() * bucket_types.len());
    for &bucket_type in bucket_types {
        for size in sizes {
            out.push(Scenario::new(size, bucket_type)?);
        }
    }
    Ok(out)
}

/// "8KB" → 8192, "1MB" → 1048576, "512B" / "512" → 512. Binary multiples.
pub fn parse_size(label: &str) -> Result<usize, BenchError> {
    let s = label.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };
    digits
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| BenchError::InvalidSize(label.to_string()))
}

/// `perf-standard-<id>` or `perf-express-<id>--<az>--x-s3`, where `<id>` is
/// the first 8 characters of a lowercase v4 UUID.
pub fn bucket_name(bucket_type: BucketType, az_id: &str) -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let id = &uuid[..8];
    match bucket_type {
        BucketType::Standard => format!("perf-standard-{id}"),
        BucketType::Express => format!("perf-express-{id}--{az_id}--x-s3"),
    }
}

// ─── Run configuration ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Concurrent Tokio tasks per scenario
    pub concurrency: u32,
    /// Put/get pairs per task
    pub iterations: u32,
    /// Availability zone used in express bucket names
    pub az_id: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            iterations: 1,
            az_id: "use1-az4".into(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.concurrency == 0 || self.concurrency > 500 {
            return Err(BenchError::InvalidConfig(
                "concurrency must be between 1 and 500".into(),
            ));
        }
        if self.iterations == 0 || self.iterations > 100_000 {
            return Err(BenchError::InvalidConfig(
                "iterations must be between 1 and 100000".into(),
            ));
        }
        if self.az_id.trim().is_empty() {
            return Err(BenchError::InvalidConfig("az_id must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_labels() {
        assert_eq!(parse_size("8KB").unwrap(), 8 * 1024);
        assert_eq!(parse_size("1mb").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("512B").unwrap(), 512);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn default_matrix_has_six_cases() {
        let m = default_matrix();
        assert_eq!(m.len(), 6);
        assert_eq!(m[0].size_label, "8KB");
        assert_eq!(m[0].bucket_type, BucketType::Standard);
        assert_eq!(m[5].size_label, "1MB");
        assert_eq!(m[5].bucket_type, BucketType::Express);
    }

    #[test]
    fn bucket_names() {
        let standard = bucket_name(BucketType::Standard, "use1-az4");
        assert!(standard.starts_with("perf-standard-"));
        assert_eq!(standard.len(), "perf-standard-".len() + 8);

        let express = bucket_name(BucketType::Express, "use1-az4");
        assert!(express.starts_with("perf-express-"));
        assert!(express.ends_with("--use1-az4--x-s3"));
    }

    #[test]
    fn run_config_validation() {
        assert!(RunConfig::default().validate().is_ok());
        let bad = RunConfig {
            concurrency: 0,
            ..RunConfig::default()
        };
        assert!(bad.validate().is_err());
        let blank_az = RunConfig {
            az_id: " ".into(),
            ..RunConfig::default()
        };
        assert!(blank_az.validate().is_err());
    }
}
