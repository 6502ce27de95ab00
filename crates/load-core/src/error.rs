use std::path::PathBuf;

/// Errors that reject a run before any request is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("thread count must be at least 1")]
    ZeroThreads,

    #[error("request count must be at least 1")]
    ZeroRequests,

    #[error("interval must be a finite, non-negative number of seconds (got {0})")]
    InvalidInterval(f64),

    #[error("request timeout must be greater than 0ms")]
    ZeroTimeout,

    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("target URL must use http:// or https:// (got scheme '{0}')")]
    UnsupportedScheme(String),

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Transport-level failure of a single request. Recorded in the outcome and
/// never propagated out of a worker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),

    #[error("request error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_connect() {
            RequestError::Connect(err.to_string())
        } else {
            RequestError::Other(err.to_string())
        }
    }
}

/// Fatal errors of a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::ZeroThreads.to_string(),
            "thread count must be at least 1"
        );
        assert_eq!(
            ConfigError::UnsupportedScheme("ftp".into()).to_string(),
            "target URL must use http:// or https:// (got scheme 'ftp')"
        );
    }

    #[test]
    fn test_run_error_is_transparent_for_config() {
        let err: RunError = ConfigError::ZeroRequests.into();
        assert_eq!(err.to_string(), "request count must be at least 1");
    }
}
