use crate::error::{ConfigError, RequestError};
use reqwest::Method;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SendReport, RequestError>> + Send + 'a>>;

/// What a completed request reports back: any status, including 4xx/5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub status: u16,
    pub latency: Duration,
}

/// Trait for the HTTP collaborator that issues one request per call
pub trait RequestSender: Send + Sync {
    fn name(&self) -> &'static str;

    fn send<'a>(&'a self, url: &'a Url) -> SendFuture<'a>;
}

/// Mock sender for testing (fixed status and latency, or always failing)
pub struct MockSender {
    status: u16,
    latency: Duration,
    fail_with: Option<RequestError>,
    simulate_delay: bool,
    calls: AtomicU64,
}

impl MockSender {
    pub fn new(status: u16, latency: Duration) -> Self {
        Self {
            status,
            latency,
            fail_with: None,
            simulate_delay: false,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing(error: RequestError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::new(0, Duration::ZERO)
        }
    }

    /// Actually sleep for the reported latency on every call.
    pub fn with_delay(mut self) -> Self {
        self.simulate_delay = true;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl RequestSender for MockSender {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn send<'a>(&'a self, _url: &'a Url) -> SendFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.simulate_delay {
                sleep(self.latency).await;
            }

            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(SendReport {
                    status: self.status,
                    latency: self.latency,
                }),
            }
        })
    }
}

/// reqwest-backed sender
pub struct HttpSender {
    client: reqwest::Client,
    method: Method,
}

impl HttpSender {
    pub fn new(method: Method, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self { client, method })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    async fn execute(&self, url: &Url) -> Result<SendReport, RequestError> {
        let start = Instant::now();
        let response = self
            .client
            .request(self.method.clone(), url.clone())
            .send()
            .await?;
        let status = response.status().as_u16();

        // Latency covers the whole response, body included.
        response.bytes().await?;

        Ok(SendReport {
            status,
            latency: start.elapsed(),
        })
    }
}

impl RequestSender for HttpSender {
    fn name(&self) -> &'static str {
        "http"
    }

    fn send<'a>(&'a self, url: &'a Url) -> SendFuture<'a> {
        Box::pin(self.execute(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    #[tokio::test]
    async fn test_mock_sender_reports_fixed_outcome() {
        let sender = MockSender::new(204, Duration::from_millis(3));
        let url = target();

        let report = sender.send(&url).await.unwrap();
        assert_eq!(report.status, 204);
        assert_eq!(report.latency, Duration::from_millis(3));

        sender.send(&url).await.unwrap();
        assert_eq!(sender.calls(), 2);
        assert_eq!(sender.name(), "mock");
    }

    #[tokio::test]
    async fn test_failing_mock_sender() {
        let sender = MockSender::failing(RequestError::Timeout);
        let err = sender.send(&target()).await.unwrap_err();
        assert_eq!(err, RequestError::Timeout);
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_sender_delay() {
        let sender = MockSender::new(200, Duration::from_millis(20)).with_delay();
        let start = Instant::now();
        sender.send(&target()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_http_sender_builds() {
        let sender = HttpSender::new(Method::GET, Duration::from_secs(1)).unwrap();
        assert_eq!(sender.name(), "http");
        assert_eq!(sender.method(), &Method::GET);
    }
}
