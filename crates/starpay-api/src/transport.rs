// Shared transport configuration for building reqwest::Client instances.
//
// Every request the pipeline sends goes through a client built here, so
// the JSON default headers and the request budget are applied uniformly.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::Error;

/// Per-request budget. Exceeding it yields `Error::Network { timed_out: true }`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

const USER_AGENT: &str = concat!("starpay-admin/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// The `Accept` / `Content-Type: application/json` pair sent on every request.
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        let json = HeaderValue::from_static("application/json");
        headers.insert(ACCEPT, json.clone());
        headers.insert(CONTENT_TYPE, json);
        headers
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(Self::default_headers())
            .build()
            .map_err(|e| Error::Network {
                message: format!("failed to build HTTP client: {e}"),
                timed_out: false,
            })
    }

    /// Timeout in whole milliseconds, for log fields.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
