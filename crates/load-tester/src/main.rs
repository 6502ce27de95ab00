use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use load_core::{Dispatcher, HttpSender, MockSender, RequestSender, RunConfig, RunSummary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Above this many threads the user must confirm the run.
const HIGH_THREAD_WARNING: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "load-tester")]
#[command(about = "Send concurrent HTTP requests to a URL and report latency and throughput")]
struct Args {
    /// Target URL to test
    #[arg(long, required_unless_present = "config")]
    url: Option<String>,

    /// Number of concurrent workers [default: 5]
    #[arg(long)]
    threads: Option<usize>,

    /// Total number of requests to send [default: 100]
    #[arg(long)]
    requests: Option<u64>,

    /// Seconds between requests within one worker [default: 0.1]
    #[arg(long)]
    interval: Option<f64>,

    /// HTTP method [default: GET]
    #[arg(long)]
    method: Option<String>,

    /// Per-request timeout in milliseconds [default: 10000]
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// TOML file with run settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request mode: http sends real requests, mock simulates 200 responses
    #[arg(long, value_enum, default_value_t = Mode::Http)]
    mode: Mode,

    /// Skip the confirmation prompt for high thread counts
    #[arg(long, short = 'y')]
    yes: bool,

    /// Write the summary as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Http,
    Mock,
}

#[derive(Debug, Serialize)]
struct RunReport {
    timestamp: String,
    url: String,
    method: String,
    threads: usize,
    interval_secs: f64,
    duration_ms: f64,
    total_requests: u64,
    successful: u64,
    errors: u64,
    requests_per_sec: f64,
    latency_min_ms: f64,
    latency_max_ms: f64,
    latency_mean_ms: f64,
    latency_median_ms: f64,
    latency_stddev_ms: f64,
    latency_p95_ms: f64,
    latency_p99_ms: f64,
    status_codes: BTreeMap<u16, u64>,
    error_messages: BTreeMap<String, u64>,
}

impl RunReport {
    fn new(config: &RunConfig, summary: &RunSummary) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            url: config.url.clone(),
            method: config.method.to_ascii_uppercase(),
            threads: config.threads,
            interval_secs: config.interval,
            duration_ms: as_ms(summary.duration),
            total_requests: summary.total_requests,
            successful: summary.successful,
            errors: summary.errors,
            requests_per_sec: summary.requests_per_sec,
            latency_min_ms: as_ms(summary.latency.min),
            latency_max_ms: as_ms(summary.latency.max),
            latency_mean_ms: as_ms(summary.latency.mean),
            latency_median_ms: as_ms(summary.latency.median),
            latency_stddev_ms: as_ms(summary.latency.stddev),
            latency_p95_ms: as_ms(summary.latency.p95),
            latency_p99_ms: as_ms(summary.latency.p99),
            status_codes: summary.status_codes.clone(),
            error_messages: summary.error_messages.clone(),
        }
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    // Invalid settings stop here, before any traffic.
    let plan = config.validate().context("Invalid run configuration")?;

    if plan.threads > HIGH_THREAD_WARNING && !args.yes && !confirm_high_thread_count()? {
        println!("Load test aborted.");
        return Ok(());
    }

    let sender: Arc<dyn RequestSender> = match args.mode {
        Mode::Mock => Arc::new(MockSender::new(200, Duration::from_millis(5)).with_delay()),
        Mode::Http => Arc::new(
            HttpSender::new(plan.method.clone(), plan.timeout)
                .context("Failed to create HTTP sender")?,
        ),
    };

    println!("\nStarting load test on {}", plan.url);
    println!(
        "Threads: {}, Requests: {}, Interval: {}s",
        plan.threads, plan.requests, config.interval
    );
    println!("{}", "=".repeat(80));

    let summary = Dispatcher::new(sender)
        .run(&plan)
        .await
        .context("Load test failed")?;

    println!("{}", "=".repeat(80));
    print_summary(&summary);

    if let Some(path) = &args.output {
        write_report(path, &RunReport::new(&config, &summary))?;
        info!("Results written to {:?}", path);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => RunConfig::default(),
    };

    if let Some(url) = &args.url {
        config.url = url.clone();
    }
    if let Some(method) = &args.method {
        config.method = method.clone();
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(requests) = args.requests {
        config.requests = requests;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    if config.url.is_empty() {
        anyhow::bail!("No target URL: pass --url or set `url` in the config file");
    }

    Ok(config)
}

fn confirm_high_thread_count() -> Result<bool> {
    warn!("Using a high number of threads may cause excessive load.");
    print!("Do you want to continue? (y/n): ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.successful == 0 {
        println!("No successful requests were made.");
    }

    println!("\nLoad Test Results:");
    println!("  Test Duration: {:.2} seconds", summary.duration.as_secs_f64());
    println!("  Requests Per Second: {:.2}", summary.requests_per_sec);
    println!("  Total Requests: {}", summary.total_requests);
    println!("  Successful Requests: {}", summary.successful);
    println!("  Failed Requests: {}", summary.errors);

    if summary.successful > 0 {
        let latency = &summary.latency;
        println!("\nResponse Time Statistics (seconds):");
        println!("  Min: {:.4}", latency.min.as_secs_f64());
        println!("  Max: {:.4}", latency.max.as_secs_f64());
        println!("  Mean: {:.4}", latency.mean.as_secs_f64());
        println!("  Median: {:.4}", latency.median.as_secs_f64());
        if summary.successful > 1 {
            println!("  Std Dev: {:.4}", latency.stddev.as_secs_f64());
        }
        println!("  p95: {:.4}", latency.p95.as_secs_f64());
        println!("  p99: {:.4}", latency.p99.as_secs_f64());

        println!("\nStatus Code Distribution:");
        for (status, count) in &summary.status_codes {
            println!(
                "  {}: {} ({:.1}%)",
                status,
                count,
                summary.status_share(*status)
            );
        }
    }

    if summary.errors > 0 {
        println!("\nError Types ({} total):", summary.errors);
        for (message, count) in summary.errors_by_frequency() {
            println!("  {}: {}", message, count);
        }
    }
    println!();
}
