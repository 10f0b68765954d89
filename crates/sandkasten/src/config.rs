//! Client configuration.

use std::time::Duration;

use crate::errors::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for a [`crate::SandboxClient`].
///
/// The request timeout applies per call; for `exec_stream` it bounds only the
/// time to the response head, not total stream duration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build a config from `SANDKASTEN_API_KEY`, `SANDKASTEN_BASE_URL`, and
    /// `SANDKASTEN_TIMEOUT_SECS`. Only the API key is required.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var("SANDKASTEN_API_KEY")
            .map_err(|_| ClientError::usage("SANDKASTEN_API_KEY is not set"))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("SANDKASTEN_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("SANDKASTEN_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ClientError::usage(format!(
                    "SANDKASTEN_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
