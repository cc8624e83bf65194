use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::dispatch::CallDispatcher;
use super::store::SimulatedObjectStore;
use super::{bucket_name, RunConfig, Scenario};
use crate::metrics::MetricsCollector;

// ─── Result types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub size_label: String,
    pub bucket_type: &'static str,
    pub bucket: String,
    pub puts_ok: u64,
    pub puts_failed: u64,
    pub gets_ok: u64,
    pub gets_failed: u64,
    /// Set when the scenario could not run at all
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub scenarios: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.skipped.is_none()).count()
    }

    pub fn total_failures(&self) -> u64 {
        self.scenarios
            .iter()
            .map(|s| s.puts_failed + s.gets_failed)
            .sum()
    }
}

#[derive(Default)]
struct WorkerTally {
    puts_ok: u64,
    puts_failed: u64,
    gets_ok: u64,
    gets_failed: u64,
}

// ─── Public entry point ──────────────────────────────────────────

/// Runs every scenario in order. Within a scenario, `concurrency` Tokio
/// tasks each perform `iterations` put/get pairs against one bucket.
///
/// The collector's test context is switched before each scenario, so
/// records carry that scenario's size and bucket-type labels.
pub async fn run(
    config: &RunConfig,
    scenarios: &[Scenario],
    collector: &MetricsCollector,
    dispatcher: Arc<CallDispatcher>,
    store: Arc<SimulatedObjectStore>,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for scenario in scenarios {
        info!(size = %scenario.size_label, bucket_type = %scenario.bucket_type, "running scenario");
        collector.set_test_context(&scenario.size_label, scenario.bucket_type.label());

        let result = run_scenario(config, scenario, &dispatcher, &store).await;
        if let Some(reason) = &result.skipped {
            warn!(size = %scenario.size_label, bucket_type = %scenario.bucket_type, "scenario skipped: {reason}");
        }
        summary.scenarios.push(result);
    }

    summary
}

async fn run_scenario(
    config: &RunConfig,
    scenario: &Scenario,
    dispatcher: &Arc<CallDispatcher>,
    store: &Arc<SimulatedObjectStore>,
) -> ScenarioResult {
    let bucket = bucket_name(scenario.bucket_type, &config.az_id);
    let mut result = ScenarioResult {
        size_label: scenario.size_label.clone(),
        bucket_type: scenario.bucket_type.label(),
        bucket: bucket.clone(),
        puts_ok: 0,
        puts_failed: 0,
        gets_ok: 0,
        gets_failed: 0,
        skipped: None,
    };

    // ── Setup ───────────────────────────────────────────────────
    let created = {
        let s: &SimulatedObjectStore = store;
        let (b, t) = (bucket.as_str(), scenario.bucket_type);
        dispatcher
            .dispatch("CreateBucket", move || s.create_bucket(b, t))
            .await
    };
    if let Err(e) = created {
        result.skipped = Some(format!("CreateBucket failed for {bucket}: {e}"));
        return result;
    }
    debug!(bucket = %bucket, "bucket created");

    // ── Load ────────────────────────────────────────────────────
    let payload: Arc<[u8]> = vec![b'x'; scenario.size_bytes].into();
    let mut handles = Vec::with_capacity(config.concurrency as usize);

    for worker_id in 0..config.concurrency {
        let dispatcher = dispatcher.clone();
        let store = store.clone();
        let bucket = bucket.clone();
        let payload = payload.clone();
        let iterations = config.iterations;

        handles.push(tokio::spawn(async move {
            worker(worker_id, iterations, &dispatcher, &store, &bucket, payload).await
        }));
    }

    for h in handles {
        match h.await {
            Ok(tally) => {
                result.puts_ok += tally.puts_ok;
                result.puts_failed += tally.puts_failed;
                result.gets_ok += tally.gets_ok;
                result.gets_failed += tally.gets_failed;
            }
            Err(e) => warn!("benchmark worker aborted: {e}"),
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────
    cleanup(config, dispatcher, store, &bucket).await;

    info!(
        bucket = %result.bucket,
        puts_ok = result.puts_ok,
        gets_ok = result.gets_ok,
        puts_failed = result.puts_failed,
        gets_failed = result.gets_failed,
        "scenario finished"
    );
    result
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    iterations: u32,
    dispatcher: &CallDispatcher,
    store: &SimulatedObjectStore,
    bucket: &str,
    payload: Arc<[u8]>,
) -> WorkerTally {
    let key = object_key(id);
    let key = key.as_str();
    let mut tally = WorkerTally::default();

    for _ in 0..iterations {
        let body = payload.clone();
        let put = dispatcher
            .dispatch("PutObject", move || store.put_object(bucket, key, body.clone()))
            .await;
        match put {
            Ok(()) => tally.puts_ok += 1,
            Err(e) => {
                warn!(bucket, key, "PutObject failed: {e}");
                tally.puts_failed += 1;
                continue;
            }
        }

        let get = dispatcher
            .dispatch("GetObject", move || store.get_object(bucket, key))
            .await;
        match get {
            Ok(body) if body.len() == payload.len() => tally.gets_ok += 1,
            Ok(body) => {
                warn!(bucket, key, "GetObject returned {} bytes, expected {}", body.len(), payload.len());
                tally.gets_failed += 1;
            }
            Err(e) => {
                warn!(bucket, key, "GetObject failed: {e}");
                tally.gets_failed += 1;
            }
        }
    }

    tally
}

async fn cleanup(
    config: &RunConfig,
    dispatcher: &CallDispatcher,
    store: &SimulatedObjectStore,
    bucket: &str,
) {
    for id in 0..config.concurrency {
        let key = object_key(id);
        let key = key.as_str();
        if let Err(e) = dispatcher
            .dispatch("DeleteObject", move || store.delete_object(bucket, key))
            .await
        {
            warn!(bucket, key, "DeleteObject failed: {e}");
        }
    }
    if let Err(e) = dispatcher
        .dispatch("DeleteBucket", move || store.delete_bucket(bucket))
        .await
    {
        warn!(bucket, "DeleteBucket failed: {e}");
    }
}

fn object_key(worker_id: u32) -> String {
    format!("test-object-{worker_id}")
}
