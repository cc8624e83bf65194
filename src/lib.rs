pub mod bench;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitoring;
pub mod report;

pub use config::ReporterConfig;
pub use error::ReportError;
pub use metrics::{
    CoreMetrics, Dimension, HttpClientMetric, MetricRecord, MetricsCollector, OperationFilter,
    TestContext,
};
pub use monitoring::{CallMonitor, CallToken, MonitorRegistry};
pub use report::{JsonReporter, PublishOutcome, ReportFormatKind};
