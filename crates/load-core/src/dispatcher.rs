use crate::collector::{RequestOutcome, ResultCollector};
use crate::config::{RunConfig, RunPlan};
use crate::error::RunError;
use crate::sender::{HttpSender, RequestSender};
use crate::stats::RunSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

const MAX_PREALLOC: usize = 1 << 20;

/// Split `total` requests over `workers`: every worker gets the base share and
/// the first `total % workers` workers get one more.
///
/// Workers that would get nothing are left out, so the result has
/// `min(workers, total)` entries.
pub fn partition(total: u64, workers: usize) -> Vec<u64> {
    let active = u64::try_from(workers).unwrap_or(u64::MAX).min(total);
    if active == 0 {
        return Vec::new();
    }
    let base = total / active;
    let rem = total % active;
    (0..active)
        .map(|idx| if idx < rem { base + 1 } else { base })
        .collect()
}

/// Runs a fixed pool of workers against one target and summarizes the result.
pub struct Dispatcher {
    sender: Arc<dyn RequestSender>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn RequestSender>) -> Self {
        Self { sender }
    }

    pub fn sender_name(&self) -> &'static str {
        self.sender.name()
    }

    pub async fn run(&self, plan: &RunPlan) -> Result<RunSummary, RunError> {
        let shares = partition(plan.requests, plan.threads);
        let capacity =
            usize::try_from(plan.requests).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC));
        let collector = Arc::new(ResultCollector::with_capacity(capacity));
        let progress = Progress::new(plan.requests);

        info!(
            "Starting {} {} with {} workers, {} requests, interval {:?} (sender: {})",
            plan.method,
            plan.url,
            shares.len(),
            plan.requests,
            plan.interval,
            self.sender.name()
        );

        let start_time = Instant::now();
        let mut handles = Vec::with_capacity(shares.len());

        for (worker_idx, share) in shares.into_iter().enumerate() {
            let worker = Worker {
                idx: worker_idx,
                share,
                url: plan.url.clone(),
                interval: plan.interval,
                sender: Arc::clone(&self.sender),
                collector: Arc::clone(&collector),
                progress,
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            handle.await?;
        }
        let duration = start_time.elapsed();

        let outcomes = match Arc::try_unwrap(collector) {
            Ok(collector) => collector.into_outcomes(),
            Err(shared) => shared.snapshot(),
        };

        let summary = RunSummary::from_outcomes(&outcomes, duration);
        info!(
            "Run finished in {:?}: {} ok, {} errors, {:.2} req/s",
            summary.duration, summary.successful, summary.errors, summary.requests_per_sec
        );

        Ok(summary)
    }
}

/// Validate `config`, then run it with a reqwest-backed sender.
///
/// Configuration errors are returned before any request is issued.
pub async fn run_load_test(config: &RunConfig) -> Result<RunSummary, RunError> {
    let plan = config.validate()?;
    let sender = HttpSender::new(plan.method.clone(), plan.timeout)?;
    Dispatcher::new(Arc::new(sender)).run(&plan).await
}

#[derive(Debug, Clone, Copy)]
struct Progress {
    total: u64,
    every: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            total,
            every: (total / 10).max(1),
        }
    }

    fn report(&self, completed: usize) {
        let completed = completed as u64;
        if completed % self.every == 0 || completed == self.total {
            info!("Progress: {}/{} requests completed", completed, self.total);
        }
    }
}

struct Worker {
    idx: usize,
    share: u64,
    url: Url,
    interval: Duration,
    sender: Arc<dyn RequestSender>,
    collector: Arc<ResultCollector>,
    progress: Progress,
}

impl Worker {
    async fn run(self) {
        debug!("Worker {} starting, {} requests", self.idx, self.share);

        for i in 0..self.share {
            let start = Instant::now();
            let outcome = match self.sender.send(&self.url).await {
                Ok(report) => RequestOutcome::success(report.status, report.latency),
                Err(e) => {
                    warn!("Worker {} request failed: {}", self.idx, e);
                    RequestOutcome::failure(start.elapsed(), e.to_string())
                }
            };

            let completed = self.collector.submit(outcome);
            self.progress.report(completed);

            if i + 1 < self.share && !self.interval.is_zero() {
                sleep(self.interval).await;
            }
        }

        debug!("Worker {} done", self.idx);
    }
}
