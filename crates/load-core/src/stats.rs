use crate::collector::RequestOutcome;
use std::collections::BTreeMap;
use std::time::Duration;

/// Latency statistics over successful requests. All zero when nothing succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub median: Duration,
    /// Sample standard deviation; zero with fewer than two samples
    pub stddev: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl LatencyStats {
    pub fn from_latencies(latencies: &[Duration]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let n = sorted.len();
        let total_nanos: u128 = sorted.iter().map(Duration::as_nanos).sum();
        let mean = nanos_to_duration(total_nanos / n as u128);

        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2
        } else {
            sorted[n / 2]
        };

        let stddev = if n > 1 {
            let mean_nanos = total_nanos as f64 / n as f64;
            let variance = sorted
                .iter()
                .map(|d| (d.as_nanos() as f64 - mean_nanos).powi(2))
                .sum::<f64>()
                / (n as f64 - 1.0);
            nanos_to_duration(variance.sqrt().round() as u128)
        } else {
            Duration::ZERO
        };

        Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
            stddev,
            p95: percentile(&sorted, 95),
            p99: percentile(&sorted, 99),
        }
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Nearest-rank percentile over an ascending, non-empty slice.
fn percentile(sorted: &[Duration], p: u64) -> Duration {
    let n = sorted.len() as u64;
    let rank = (n * p).div_ceil(100).max(1);
    sorted[(rank - 1) as usize]
}

/// Aggregate statistics computed once over all outcomes of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_requests: u64,
    pub successful: u64,
    pub errors: u64,
    /// Wall clock from first dispatch to last completion
    pub duration: Duration,
    pub requests_per_sec: f64,
    pub latency: LatencyStats,
    /// Responses grouped by status code
    pub status_codes: BTreeMap<u16, u64>,
    /// Failed requests grouped by error message
    pub error_messages: BTreeMap<String, u64>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[RequestOutcome], duration: Duration) -> Self {
        let mut latencies = Vec::with_capacity(outcomes.len());
        let mut status_codes = BTreeMap::new();
        let mut error_messages = BTreeMap::new();
        let mut errors = 0u64;

        for outcome in outcomes {
            match outcome.status_code {
                Some(status) => {
                    latencies.push(outcome.latency);
                    *status_codes.entry(status).or_insert(0) += 1;
                }
                None => {
                    errors += 1;
                    let message = outcome.error.as_deref().unwrap_or("unknown error");
                    *error_messages.entry(message.to_string()).or_insert(0) += 1;
                }
            }
        }

        let total_requests = outcomes.len() as u64;
        let secs = duration.as_secs_f64();
        let requests_per_sec = if secs > 0.0 {
            total_requests as f64 / secs
        } else {
            0.0
        };

        Self {
            total_requests,
            successful: latencies.len() as u64,
            errors,
            duration,
            requests_per_sec,
            latency: LatencyStats::from_latencies(&latencies),
            status_codes,
            error_messages,
        }
    }

    /// Share of requests that got a response, in percent.
    pub fn success_rate(&self) -> f64 {
        self.percent_of_total(self.successful)
    }

    /// Share of requests answered with `status`, in percent.
    pub fn status_share(&self, status: u16) -> f64 {
        self.percent_of_total(self.status_codes.get(&status).copied().unwrap_or(0))
    }

    /// Error messages, most frequent first.
    pub fn errors_by_frequency(&self) -> Vec<(&str, u64)> {
        let mut errors: Vec<(&str, u64)> = self
            .error_messages
            .iter()
            .map(|(message, count)| (message.as_str(), *count))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        errors
    }

    fn percent_of_total(&self, count: u64) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        count as f64 * 100.0 / self.total_requests as f64
    }
}
