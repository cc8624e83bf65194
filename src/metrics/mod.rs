pub mod collector;
pub mod percentiles;

use std::collections::HashMap;

use serde::Serialize;

pub use collector::{MetricSummary, MetricsCollector, OperationFilter, ScenarioGuard, TestContext};
pub use percentiles::PercentileSet;

/// Unit string carried by every latency record.
pub const UNIT_MILLISECONDS: &str = "Milliseconds";

// ─── Record types ────────────────────────────────────────────────

/// A categorical `(name, value)` tag attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One observed call, immutable once appended to a collector.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// e.g. "s3.putobject.latency"
    pub name: String,
    pub description: String,
    pub unit: String,
    /// Whole seconds since the Unix epoch at creation time
    pub timestamp: i64,
    /// At least one sample, milliseconds
    pub measurements: Vec<f64>,
    pub dimensions: Vec<Dimension>,
    /// Which terminal hook produced the record
    pub success: bool,
    /// Service and operation as reported by the caller (original case)
    pub service: String,
    pub operation: String,
}

impl MetricRecord {
    /// Build a latency record for `service`/`operation` stamped with the
    /// current wall-clock time.
    pub fn latency(service: &str, operation: &str, latency_ms: f64, success: bool) -> Self {
        Self {
            name: latency_metric_name(service, operation),
            description: format!("Time to complete {operation} operation"),
            unit: UNIT_MILLISECONDS.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            measurements: vec![latency_ms],
            dimensions: Vec::new(),
            success,
            service: service.to_string(),
            operation: operation.to_string(),
        }
    }

    /// First sample, or 0.0 for a record built by hand without one.
    pub fn primary_measurement(&self) -> f64 {
        self.measurements.first().copied().unwrap_or(0.0)
    }
}

/// `<service>.<operation>.latency`, both lowercased.
pub fn latency_metric_name(service: &str, operation: &str) -> String {
    format!(
        "{}.{}.latency",
        service.to_lowercase(),
        operation.to_lowercase()
    )
}

// ─── Core metrics bag ────────────────────────────────────────────

/// Well-known keys the transport layer reports per call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpClientMetric {
    AcquireConnectionLatency,
    ConnectionReused,
    ConnectLatency,
    DnsLatency,
    RequestLatency,
    SslLatency,
    TcpLatency,
}

impl HttpClientMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcquireConnectionLatency => "AcquireConnectionLatency",
            Self::ConnectionReused => "ConnectionReused",
            Self::ConnectLatency => "ConnectLatency",
            Self::DnsLatency => "DnsLatency",
            Self::RequestLatency => "RequestLatency",
            Self::SslLatency => "SslLatency",
            Self::TcpLatency => "TcpLatency",
        }
    }
}

/// Named numeric measurements captured by the transport for one call.
/// Which keys are present varies by transport; absence is normal.
#[derive(Debug, Clone, Default)]
pub struct CoreMetrics {
    http_client: HashMap<String, f64>,
}

impl CoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: HttpClientMetric, value: f64) -> Self {
        self.insert(metric.as_str(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.http_client.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.http_client.get(key).copied()
    }

    pub fn metric(&self, metric: HttpClientMetric) -> Option<f64> {
        self.get(metric.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.http_client.is_empty()
    }
}
