use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Recorded result of one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub latency: Duration,
    /// Set when a response came back, whatever its status
    pub status_code: Option<u16>,
    /// Set when the request failed at the transport level
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn success(status_code: u16, latency: Duration) -> Self {
        Self {
            latency,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn failure(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            latency,
            status_code: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_some()
    }
}

/// Append-only, mutex-guarded store of outcomes shared by all workers.
#[derive(Debug, Default)]
pub struct ResultCollector {
    outcomes: Mutex<Vec<RequestOutcome>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append an outcome and return how many outcomes have been collected.
    pub fn submit(&self, outcome: RequestOutcome) -> usize {
        let mut outcomes = self.lock();
        outcomes.push(outcome);
        outcomes.len()
    }

    /// Arrival-ordered copy of everything collected so far.
    pub fn snapshot(&self) -> Vec<RequestOutcome> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Finalize the collector and take ownership of its outcomes.
    pub fn into_outcomes(self) -> Vec<RequestOutcome> {
        self.outcomes
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Outcomes are plain data pushed in one step, so a panic elsewhere
    // cannot leave the vector half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<RequestOutcome>> {
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_submit_preserves_arrival_order() {
        let collector = ResultCollector::new();
        assert!(collector.is_empty());

        assert_eq!(
            collector.submit(RequestOutcome::success(200, Duration::from_millis(5))),
            1
        );
        assert_eq!(
            collector.submit(RequestOutcome::failure(
                Duration::from_millis(7),
                "connection refused"
            )),
            2
        );

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].status_code, Some(200));
        assert!(snapshot[0].is_success());
        assert_eq!(snapshot[1].error.as_deref(), Some("connection refused"));
        assert!(!snapshot[1].is_success());
    }

    #[test]
    fn test_concurrent_submit_loses_nothing() {
        let collector = Arc::new(ResultCollector::with_capacity(8 * 250));

        let handles: Vec<_> = (0..8u16)
            .map(|worker| {
                let collector = Arc::clone(&collector);
                std::thread::spawn(move || {
                    for i in 0..250u64 {
                        collector.submit(RequestOutcome::success(
                            200 + worker,
                            Duration::from_micros(i),
                        ));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.len(), 2000);
        let outcomes = Arc::try_unwrap(collector).unwrap().into_outcomes();
        for worker in 0..8u16 {
            let count = outcomes
                .iter()
                .filter(|o| o.status_code == Some(200 + worker))
                .count();
            assert_eq!(count, 250);
        }
    }
}
