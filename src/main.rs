use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use perf_reporter::bench::{
    self, BucketType, CallDispatcher, RunConfig, SimulatedObjectStore, BENCHMARKED_OPERATIONS,
    SERVICE_NAME,
};
use perf_reporter::metrics::MetricSummary;
use perf_reporter::{
    CallMonitor, MetricsCollector, MonitorRegistry, OperationFilter, PublishOutcome,
    ReporterConfig,
};

#[derive(Parser)]
#[command(
    name = "perf-bench",
    about = "Object-store latency benchmark with JSON performance reporting"
)]
struct Args {
    /// Availability zone id used for express bucket names
    #[arg(long = "az-id", default_value = "use1-az4")]
    az_id: String,

    /// Concurrent workers per scenario
    #[arg(long, default_value_t = 1)]
    concurrency: u32,

    /// Put/get pairs per worker
    #[arg(long, default_value_t = 1)]
    iterations: u32,

    /// Object sizes to test, e.g. 8KB,64KB,1MB
    #[arg(long, value_delimiter = ',', default_value = "8KB,64KB,1MB")]
    sizes: Vec<String>,

    /// s3-standard and/or s3-express
    #[arg(long = "bucket-types", value_delimiter = ',', default_value = "s3-standard,s3-express")]
    bucket_types: Vec<String>,

    /// Operations to record: "all" or a comma-separated list [default: PutObject,GetObject]
    #[arg(long)]
    operations: Option<String>,

    /// Report schema: benchmark | compact
    #[arg(long)]
    format: Option<String>,

    /// Report file path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Tag records with Service and Operation dimensions
    #[arg(long)]
    call_dimensions: bool,

    /// Total attempts per call, including the first
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Probability that a simulated call fails transiently
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    /// Limit injected faults to these operations, e.g. PutObject,GetObject
    #[arg(long = "fault-operations", value_delimiter = ',')]
    fault_operations: Vec<String>,

    /// Report simulated latencies without sleeping for them
    #[arg(long)]
    no_delay: bool,

    /// Seed for the simulated latency / fault generator
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════╗");
    eprintln!("║   ⏱   OBJECT STORE LATENCY BENCHMARK             ║");
    eprintln!("╚══════════════════════════════════════════════════╝");
    eprintln!();

    // ── 1. Scenario matrix ───────────────────────────────────────
    let run_config = RunConfig {
        concurrency: args.concurrency,
        iterations: args.iterations,
        az_id: args.az_id.clone(),
    };
    run_config.validate()?;

    let sizes: Vec<&str> = args.sizes.iter().map(String::as_str).collect();
    let bucket_types = args
        .bucket_types
        .iter()
        .map(|s| s.parse::<BucketType>())
        .collect::<Result<Vec<_>, _>>()?;
    let scenarios = bench::matrix(&sizes, &bucket_types)?;

    // ── 2. Reporter config (CLI > env > defaults) ────────────────
    let mut reporter_config = ReporterConfig::from_env();
    match &args.operations {
        Some(ops) => reporter_config.filter = OperationFilter::parse(ops),
        None if std::env::var("PERF_OPERATIONS").is_err() => {
            reporter_config.filter = OperationFilter::only(BENCHMARKED_OPERATIONS);
        }
        None => {}
    }
    if let Some(format) = &args.format {
        reporter_config.format = format.parse()?;
    }
    if let Some(path) = &args.output {
        reporter_config.output_path = path.clone();
    }
    if args.call_dimensions {
        reporter_config.call_dimensions = true;
    }

    // ── 3. Monitors, dispatcher, store ───────────────────────────
    let collector = Arc::new(MetricsCollector::new(&reporter_config));

    let mut registry = MonitorRegistry::new();
    let handle = collector.clone();
    registry.register(move || handle.clone() as Arc<dyn CallMonitor>);

    let dispatcher = Arc::new(
        CallDispatcher::new(SERVICE_NAME, registry.create_monitors())
            .with_max_attempts(args.max_attempts),
    );

    let mut store = SimulatedObjectStore::new()
        .with_failure_rate(args.failure_rate)
        .with_realtime(!args.no_delay);
    if !args.fault_operations.is_empty() {
        store = store.with_fault_operations(&args.fault_operations);
    }
    if let Some(seed) = args.seed {
        store = store.with_seed(seed);
    }
    let store = Arc::new(store);

    eprintln!(
        "{} scenarios  |  {} workers × {} iterations  |  report → {}",
        scenarios.len(),
        run_config.concurrency,
        run_config.iterations,
        reporter_config.output_path.display(),
    );

    // ── 4. Run ───────────────────────────────────────────────────
    let summary = bench::run(&run_config, &scenarios, &collector, dispatcher, store).await;

    print_summaries(&collector.summaries());
    if summary.completed() < scenarios.len() {
        eprintln!(
            "\n{} of {} scenarios were skipped",
            scenarios.len() - summary.completed(),
            scenarios.len()
        );
    }

    // ── 5. Publish ───────────────────────────────────────────────
    match collector.flush()? {
        PublishOutcome::Written { path } => {
            eprintln!("\nAll tests completed. Results saved to {}", path.display());
        }
        PublishOutcome::ConsoleOnly => {
            eprintln!(
                "\nAll tests completed. Could not write {}",
                reporter_config.output_path.display()
            );
        }
        PublishOutcome::FileOnly { path } => {
            eprintln!(
                "\nAll tests completed. Results saved to {} (console echo failed)",
                path.display()
            );
        }
        PublishOutcome::Empty => eprintln!("\nAll tests completed. No metrics were recorded."),
        PublishOutcome::AlreadyFlushed => {}
    }

    Ok(())
}

fn print_summaries(summaries: &[MetricSummary]) {
    if summaries.is_empty() {
        return;
    }
    eprintln!();
    eprintln!(
        "  {:<28} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "metric", "count", "p50 ms", "p95 ms", "p99 ms", "max ms"
    );
    for s in summaries {
        eprintln!(
            "  {:<28} {:>7} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            s.name, s.stats.count, s.stats.p50, s.stats.p95, s.stats.p99, s.stats.max
        );
    }
}
