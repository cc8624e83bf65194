use std::collections::{BTreeMap, BTreeSet};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::percentiles::PercentileSet;
use super::{CoreMetrics, Dimension, HttpClientMetric, MetricRecord, UNIT_MILLISECONDS};
use crate::config::ReporterConfig;
use crate::error::Result;
use crate::monitoring::{CallMonitor, CallToken};
use crate::report::{JsonReporter, PublishOutcome};

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Which operation names produce records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl OperationFilter {
    pub fn only<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(operations.into_iter().map(Into::into).collect())
    }

    /// `all`, `*` or an empty string admit everything; anything else is a
    /// comma-separated list of operation names.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "*" || value.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        Self::only(
            value.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        )
    }

    pub fn admits(&self, operation: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(operation),
        }
    }
}

/// Run-level labels applied to every record created while they are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    size: String,
    bucket_type: String,
    extra: Vec<Dimension>,
}

impl TestContext {
    pub fn new(size: impl Into<String>, bucket_type: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            bucket_type: bucket_type.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push(Dimension::new(name, value));
        self
    }

    /// `Size`, `BucketType`, then any extra tags. Empty labels are skipped.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Vec::with_capacity(2 + self.extra.len());
        if !self.size.is_empty() {
            dims.push(Dimension::new("Size", self.size.as_str()));
        }
        if !self.bucket_type.is_empty() {
            dims.push(Dimension::new("BucketType", self.bucket_type.as_str()));
        }
        dims.extend(self.extra.iter().filter(|d| !d.value.is_empty()).cloned());
        dims
    }
}

/// Aggregated view of every measurement recorded under one name.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub unit: &'static str,
    pub stats: PercentileSet,
}

/// Thread-safe call observer.
/// Dispatch workers call the lifecycle hooks; the report is published once,
/// on `flush()` or when the collector is dropped.
pub struct MetricsCollector {
    filter: OperationFilter,
    call_dimensions: bool,
    reporter: JsonReporter,
    inner: Mutex<Inner>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    // Append-only for the collector's lifetime
    records: Vec<MetricRecord>,
    // One histogram per metric name
    aggregated: BTreeMap<String, Histogram<u64>>,
    context: TestContext,
    flushed: bool,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new(config: &ReporterConfig) -> Self {
        Self::with_reporter(config, JsonReporter::from_config(config))
    }

    pub fn with_reporter(config: &ReporterConfig, reporter: JsonReporter) -> Self {
        Self {
            filter: config.filter.clone(),
            call_dimensions: config.call_dimensions,
            reporter,
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Start with `context` already applied.
    pub fn with_context(self, context: TestContext) -> Self {
        self.inner.lock().context = context;
        self
    }

    /// Set the size and bucket-type labels for records created from now on.
    /// Extra tags from an earlier `set_context` are kept.
    pub fn set_test_context(&self, size: &str, bucket_type: &str) {
        let mut inner = self.inner.lock();
        inner.context.size = size.to_string();
        inner.context.bucket_type = bucket_type.to_string();
    }

    /// Replace the whole context.
    pub fn set_context(&self, context: TestContext) -> TestContext {
        std::mem::replace(&mut self.inner.lock().context, context)
    }

    /// Apply `context` until the returned guard is dropped, then restore
    /// whatever was active before.
    pub fn scenario(&self, context: TestContext) -> ScenarioGuard<'_> {
        let previous = self.set_context(context);
        ScenarioGuard {
            collector: self,
            previous: Some(previous),
        }
    }

    pub fn context(&self) -> TestContext {
        self.inner.lock().context.clone()
    }

    pub fn filter(&self) -> &OperationFilter {
        &self.filter
    }

    pub fn reporter(&self) -> &JsonReporter {
        &self.reporter
    }

    /// Copy of every record so far, in the order they were appended.
    pub fn records(&self) -> Vec<MetricRecord> {
        self.inner.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flushed(&self) -> bool {
        self.inner.lock().flushed
    }

    /// Per-name percentile summaries, sorted by name.
    pub fn summaries(&self) -> Vec<MetricSummary> {
        self.inner
            .lock()
            .aggregated
            .iter()
            .map(|(name, hist)| MetricSummary {
                name: name.clone(),
                unit: UNIT_MILLISECONDS,
                stats: PercentileSet::from_histogram(hist),
            })
            .collect()
    }

    /// Publish the report. Only the first call produces output.
    pub fn flush(&self) -> Result<PublishOutcome> {
        let mut inner = self.inner.lock();
        if inner.flushed {
            return Ok(PublishOutcome::AlreadyFlushed);
        }
        inner.flushed = true;
        self.reporter.publish(&inner.records)
    }

    fn record_metric(
        &self,
        service: &str,
        operation: &str,
        metrics: &CoreMetrics,
        success: bool,
    ) {
        if !self.filter.admits(operation) {
            return;
        }

        let mut inner = self.inner.lock();
        if inner.flushed {
            debug!(service, operation, "report already flushed, dropping metric");
            return;
        }

        let latency_ms = metrics
            .metric(HttpClientMetric::RequestLatency)
            .unwrap_or(0.0);

        let mut record = MetricRecord::latency(service, operation, latency_ms, success);
        record.dimensions = inner.context.dimensions();
        if self.call_dimensions {
            record.dimensions.push(Dimension::new("Service", service));
            record.dimensions.push(Dimension::new("Operation", operation));
        }

        inner.aggregate(&record);
        inner.records.push(record);
    }
}

impl CallMonitor for MetricsCollector {
    fn on_call_started(&self, _service: &str, _operation: &str) -> CallToken {
        CallToken::empty()
    }

    fn on_call_succeeded(
        &self,
        service: &str,
        operation: &str,
        metrics: &CoreMetrics,
        _token: &CallToken,
    ) {
        self.record_metric(service, operation, metrics, true);
    }

    fn on_call_failed(
        &self,
        service: &str,
        operation: &str,
        metrics: &CoreMetrics,
        _token: &CallToken,
    ) {
        self.record_metric(service, operation, metrics, false);
    }

    fn on_call_retried(&self, service: &str, operation: &str, _token: &CallToken) {
        trace!(service, operation, "call retried");
    }

    fn on_call_finished(&self, service: &str, operation: &str, _token: &CallToken) {
        trace!(service, operation, "call finished");
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to publish performance report: {e}");
        }
    }
}

/// Restores the previous test context when dropped.
pub struct ScenarioGuard<'a> {
    collector: &'a MetricsCollector,
    previous: Option<TestContext>,
}

impl Drop for ScenarioGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.collector.set_context(previous);
        }
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            records: Vec::with_capacity(1024),
            aggregated: BTreeMap::new(),
            context: TestContext::default(),
            flushed: false,
        }
    }

    fn aggregate(&mut self, record: &MetricRecord) {
        if !self.aggregated.contains_key(&record.name) {
            match Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG) {
                Ok(hist) => {
                    self.aggregated.insert(record.name.clone(), hist);
                }
                Err(e) => {
                    warn!("histogram creation failed for {}: {e}", record.name);
                    return;
                }
            }
        }
        if let Some(hist) = self.aggregated.get_mut(&record.name) {
            for ms in &record.measurements {
                // Clamp to ≥ 1 μs; saturating_record caps the top end
                let us = (ms * 1000.0).round().max(1.0) as u64;
                hist.saturating_record(us);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::HttpClientMetric;

    fn quiet_collector(dir: &std::path::Path, filter: OperationFilter) -> MetricsCollector {
        let config = ReporterConfig::default()
            .with_output_path(dir.join("perf-results.json"))
            .with_echo_stdout(false)
            .with_filter(filter);
        MetricsCollector::new(&config)
    }

    fn latency(ms: f64) -> CoreMetrics {
        CoreMetrics::new().with(HttpClientMetric::RequestLatency, ms)
    }

    #[test]
    fn filter_parse() {
        assert_eq!(OperationFilter::parse("all"), OperationFilter::All);
        assert_eq!(OperationFilter::parse(" "), OperationFilter::All);
        let f = OperationFilter::parse("PutObject, GetObject,");
        assert!(f.admits("PutObject"));
        assert!(f.admits("GetObject"));
        assert!(!f.admits("DeleteObject"));
        assert!(!f.admits("putobject"));
    }

    #[test]
    fn failed_hook_records_with_success_false() {
        let dir = tempfile::tempdir().unwrap();
        let c = quiet_collector(dir.path(), OperationFilter::All);
        let token = c.on_call_started("S3", "PutObject");
        assert!(token.is_empty());
        c.on_call_failed("S3", "PutObject", &latency(9.0), &token);
        c.on_call_retried("S3", "PutObject", &token);
        c.on_call_finished("S3", "PutObject", &token);

        let records = c.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].measurements, vec![9.0]);
    }

    #[test]
    fn call_dimensions_follow_context() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReporterConfig::default()
            .with_output_path(dir.path().join("perf-results.json"))
            .with_echo_stdout(false)
            .with_call_dimensions(true);
        let c = MetricsCollector::new(&config)
            .with_context(TestContext::new("8KB", "").with_dimension("Region", "us-east-1"));

        c.on_call_succeeded("S3", "GetObject", &latency(1.0), &CallToken::empty());

        let dims = &c.records()[0].dimensions;
        assert_eq!(
            *dims,
            vec![
                Dimension::new("Size", "8KB"),
                Dimension::new("Region", "us-east-1"),
                Dimension::new("Service", "S3"),
                Dimension::new("Operation", "GetObject"),
            ]
        );
    }

    #[test]
    fn scenario_guard_restores_previous_context() {
        let dir = tempfile::tempdir().unwrap();
        let c = quiet_collector(dir.path(), OperationFilter::All);
        c.set_test_context("64KB", "s3-standard");
        {
            let _guard = c.scenario(TestContext::new("1MB", "s3-express"));
            assert_eq!(c.context(), TestContext::new("1MB", "s3-express"));
        }
        assert_eq!(c.context(), TestContext::new("64KB", "s3-standard"));
    }

    #[test]
    fn summaries_group_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let c = quiet_collector(dir.path(), OperationFilter::All);
        for ms in [10.0, 20.0, 30.0] {
            c.on_call_succeeded("S3", "PutObject", &latency(ms), &CallToken::empty());
        }
        c.on_call_succeeded("S3", "GetObject", &latency(5.0), &CallToken::empty());

        let summaries = c.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "s3.getobject.latency");
        assert_eq!(summaries[1].name, "s3.putobject.latency");
        assert_eq!(summaries[1].stats.count, 3);
        assert!((summaries[1].stats.mean - 20.0).abs() < 0.1);
    }

    #[test]
    fn metrics_after_flush_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let c = quiet_collector(dir.path(), OperationFilter::All);
        c.on_call_succeeded("S3", "PutObject", &latency(1.0), &CallToken::empty());

        assert!(matches!(c.flush().unwrap(), PublishOutcome::Written { .. }));
        c.on_call_succeeded("S3", "PutObject", &latency(2.0), &CallToken::empty());

        assert!(c.is_flushed());
        assert_eq!(c.len(), 1);
        assert_eq!(c.flush().unwrap(), PublishOutcome::AlreadyFlushed);
    }
}
