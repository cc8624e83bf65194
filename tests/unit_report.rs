use perf_reporter::metrics::{Dimension, MetricRecord};
use perf_reporter::report::{JsonReporter, Provenance, PublishOutcome, ReportFormatKind};
use perf_reporter::{CallMonitor, CoreMetrics, HttpClientMetric, MetricsCollector, ReporterConfig};
use serde_json::Value;

#[test]
fn test_schema_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = JsonReporter::new(
        ReportFormatKind::Benchmark.build(Provenance::default()),
        dir.path().join("perf-results.json"),
    );

    let mut record = MetricRecord::latency("S3", "PutObject", 123.4, true);
    record.dimensions.push(Dimension::new("Size", "64KB"));
    let date = record.timestamp;

    let mut console = Vec::new();
    let outcome = reporter.publish_to(&[record], &mut console).unwrap();
    assert!(matches!(outcome, PublishOutcome::Written { .. }));

    let text = std::fs::read_to_string(reporter.path()).unwrap();
    let v: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(v["productId"], "perf-reporter");
    assert_eq!(v["commitId"], "unknown");
    let results = v["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r["name"], "s3.putobject.latency");
    assert_eq!(r["description"], "Time to complete PutObject operation");
    assert_eq!(r["unit"], "Milliseconds");
    assert_eq!(r["date"], date);
    let dims = r["dimensions"].as_array().unwrap();
    assert_eq!(dims.len(), 1);
    assert_eq!(dims[0]["name"], "Size");
    assert_eq!(dims[0]["value"], "64KB");
    let measurements = r["measurements"].as_array().unwrap();
    assert_eq!(measurements.len(), 1);
    assert_eq!(measurements[0], 123.4);

    let console: Value = serde_json::from_slice(&console).unwrap();
    assert_eq!(console, v);
}

#[test]
fn test_compact_schema_through_collector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compact.json");
    let config = ReporterConfig::default()
        .with_output_path(&path)
        .with_echo_stdout(false)
        .with_format(ReportFormatKind::Compact);
    let c = MetricsCollector::new(&config);
    let metrics = CoreMetrics::new().with(HttpClientMetric::RequestLatency, 12.0);

    let token = c.on_call_started("S3", "GetObject");
    c.on_call_succeeded("S3", "GetObject", &metrics, &token);
    let token = c.on_call_started("S3", "PutObject");
    c.on_call_failed("S3", "PutObject", &metrics, &token);
    c.flush().unwrap();

    let v: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let entries = v["perf-results"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "S3.GetObject");
    assert_eq!(entries[0]["durationMs"], 12.0);
    assert_eq!(entries[0]["success"], true);
    assert_eq!(entries[1]["success"], false);
    assert!(v.get("results").is_none());
}
