use crate::error::ConfigError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_THREADS: usize = 5;
pub const DEFAULT_REQUESTS: u64 = 100;
pub const DEFAULT_INTERVAL_SECS: f64 = 0.1;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_METHOD: &str = "GET";

/// Raw run configuration, as read from a TOML file or assembled from CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Target URL hit by every request
    pub url: String,
    /// HTTP method, e.g. "GET" or "HEAD"
    pub method: String,
    /// Number of concurrent workers
    pub threads: usize,
    /// Total number of requests across all workers
    pub requests: u64,
    /// Pause between successive requests of one worker, in seconds
    pub interval: f64,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: DEFAULT_METHOD.to_string(),
            threads: DEFAULT_THREADS,
            requests: DEFAULT_REQUESTS,
            interval: DEFAULT_INTERVAL_SECS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RunConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Check every field and produce the plan a dispatcher can run.
    pub fn validate(&self) -> Result<RunPlan, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.requests == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        let interval = Duration::try_from_secs_f64(self.interval)
            .map_err(|_| ConfigError::InvalidInterval(self.interval))?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let url = Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        let method = Method::from_str(&self.method.trim().to_ascii_uppercase())
            .map_err(|_| ConfigError::InvalidMethod(self.method.clone()))?;

        Ok(RunPlan {
            url,
            method,
            threads: self.threads,
            requests: self.requests,
            interval,
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }
}

/// A validated [`RunConfig`]. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub url: Url,
    pub method: Method,
    pub threads: usize,
    pub requests: u64,
    pub interval: Duration,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde() {
        let config_str = r#"
url = "http://localhost:8080/health"
method = "head"
threads = 10
requests = 1000
interval = 0.25
timeout_ms = 2500
        "#;

        let config = RunConfig::from_toml_str(config_str).unwrap();
        assert_eq!(config.url, "http://localhost:8080/health");
        assert_eq!(config.threads, 10);
        assert_eq!(config.requests, 1000);
        assert_eq!(config.interval, 0.25);

        let plan = config.validate().unwrap();
        assert_eq!(plan.method, Method::HEAD);
        assert_eq!(plan.interval, Duration::from_millis(250));
        assert_eq!(plan.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = RunConfig::from_toml_str(r#"url = "http://example.com""#).unwrap();
        assert_eq!(config, RunConfig::new("http://example.com"));
        assert_eq!(config.threads, 5);
        assert_eq!(config.requests, 100);
        assert_eq!(config.interval, 0.1);
        assert_eq!(config.method, "GET");
    }

    #[test]
    fn test_zero_counts_rejected() {
        let mut config = RunConfig::new("http://example.com");
        config.threads = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreads)));

        let mut config = RunConfig::new("http://example.com");
        config.requests = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroRequests)));
    }

    #[test]
    fn test_bad_interval_rejected() {
        for interval in [-0.5, f64::NAN, f64::INFINITY] {
            let mut config = RunConfig::new("http://example.com");
            config.interval = interval;
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidInterval(_))),
                "interval {interval} should be rejected"
            );
        }

        let mut config = RunConfig::new("http://example.com");
        config.interval = 0.0;
        assert_eq!(config.validate().unwrap().interval, Duration::ZERO);
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = RunConfig::new("not a url");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let config = RunConfig::new("ftp://example.com/file");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_bad_method_rejected() {
        let mut config = RunConfig::new("http://example.com");
        config.method = "GE T".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = RunConfig::new("http://example.com");
        config.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_unreadable_file() {
        let err = RunConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
