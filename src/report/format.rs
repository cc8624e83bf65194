use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ReportError;
use crate::metrics::{Dimension, MetricRecord};

// ─── Strategy ────────────────────────────────────────────────────

/// Turns the accumulated record list into one JSON document.
pub trait ReportFormat: Send + Sync {
    fn render(&self, records: &[MetricRecord]) -> Result<String, serde_json::Error>;

    fn kind(&self) -> ReportFormatKind;
}

/// Selects one of the built-in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormatKind {
    /// `results` list with provenance fields
    #[default]
    Benchmark,
    /// `perf-results` list of `{name, durationMs, success}`
    Compact,
}

impl ReportFormatKind {
    pub fn as_name(self) -> &'static str {
        match self {
            Self::Benchmark => "benchmark",
            Self::Compact => "compact",
        }
    }

    pub fn build(self, provenance: Provenance) -> Box<dyn ReportFormat> {
        match self {
            Self::Benchmark => Box::new(BenchmarkFormat::new(provenance)),
            Self::Compact => Box::new(CompactFormat),
        }
    }
}

impl FromStr for ReportFormatKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benchmark" => Ok(Self::Benchmark),
            "compact" => Ok(Self::Compact),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}

// ─── Provenance ──────────────────────────────────────────────────

/// Static fields describing the toolchain that produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub product_id: String,
    pub sdk_version: String,
    pub commit_id: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            product_id: env!("CARGO_PKG_NAME").to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            commit_id: "unknown".to_string(),
        }
    }
}

// ─── Canonical schema ────────────────────────────────────────────

pub struct BenchmarkFormat {
    provenance: Provenance,
}

impl BenchmarkFormat {
    pub fn new(provenance: Provenance) -> Self {
        Self { provenance }
    }
}

// Field order below is the order emitted.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BenchmarkDocument<'a> {
    product_id: &'a str,
    sdk_version: &'a str,
    commit_id: &'a str,
    results: Vec<BenchmarkEntry<'a>>,
}

#[derive(Serialize)]
struct BenchmarkEntry<'a> {
    name: &'a str,
    description: &'a str,
    unit: &'a str,
    date: i64,
    #[serde(skip_serializing_if = "no_dimensions")]
    dimensions: &'a [Dimension],
    measurements: &'a [f64],
}

fn no_dimensions(dimensions: &&[Dimension]) -> bool {
    dimensions.is_empty()
}

impl ReportFormat for BenchmarkFormat {
    fn render(&self, records: &[MetricRecord]) -> Result<String, serde_json::Error> {
        let doc = BenchmarkDocument {
            product_id: &self.provenance.product_id,
            sdk_version: &self.provenance.sdk_version,
            commit_id: &self.provenance.commit_id,
            results: records
                .iter()
                .map(|r| BenchmarkEntry {
                    name: &r.name,
                    description: &r.description,
                    unit: &r.unit,
                    date: r.timestamp,
                    dimensions: &r.dimensions,
                    measurements: &r.measurements,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&doc)
    }

    fn kind(&self) -> ReportFormatKind {
        ReportFormatKind::Benchmark
    }
}

// ─── Compact schema ──────────────────────────────────────────────

pub struct CompactFormat;

#[derive(Serialize)]
struct CompactDocument {
    #[serde(rename = "perf-results")]
    perf_results: Vec<CompactEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompactEntry {
    name: String,
    duration_ms: f64,
    success: bool,
}

impl ReportFormat for CompactFormat {
    fn render(&self, records: &[MetricRecord]) -> Result<String, serde_json::Error> {
        let doc = CompactDocument {
            perf_results: records
                .iter()
                .map(|r| CompactEntry {
                    name: format!("{}.{}", r.service, r.operation),
                    duration_ms: r.primary_measurement(),
                    success: r.success,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&doc)
    }

    fn kind(&self) -> ReportFormatKind {
        ReportFormatKind::Compact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record() -> MetricRecord {
        let mut r = MetricRecord::latency("S3", "PutObject", 123.4, true);
        r.timestamp = 1_700_000_000;
        r
    }

    #[test]
    fn benchmark_fields_are_emitted_in_order() {
        let mut r = record();
        r.dimensions.push(Dimension::new("Size", "64KB"));
        let text = BenchmarkFormat::new(Provenance::default())
            .render(&[r])
            .unwrap();

        let keys = ["\"name\"", "\"description\"", "\"unit\"", "\"date\"", "\"dimensions\"", "\"measurements\""];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
        assert!(text.find("\"productId\"").unwrap() < text.find("\"results\"").unwrap());
    }

    #[test]
    fn benchmark_omits_empty_dimensions() {
        let text = BenchmarkFormat::new(Provenance::default())
            .render(&[record()])
            .unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert!(v["results"][0].get("dimensions").is_none());
        assert_eq!(v["results"][0]["date"], 1_700_000_000);
    }

    #[test]
    fn compact_uses_original_case_and_success_flag() {
        let mut failed = record();
        failed.success = false;
        let text = CompactFormat.render(&[record(), failed]).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        let entries = v["perf-results"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "S3.PutObject");
        assert_eq!(entries[0]["durationMs"], 123.4);
        assert_eq!(entries[0]["success"], true);
        assert_eq!(entries[1]["success"], false);
    }

    #[test]
    fn format_kind_parses_case_insensitively() {
        assert_eq!("Compact".parse::<ReportFormatKind>().unwrap(), ReportFormatKind::Compact);
        assert_eq!(" benchmark ".parse::<ReportFormatKind>().unwrap(), ReportFormatKind::Benchmark);
        assert!("xml".parse::<ReportFormatKind>().is_err());
    }
}
