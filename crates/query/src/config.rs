//! Client configuration and the default request headers derived from it.
//!
//! Loading configuration from files or the environment is the application's
//! job; this module only defines the shape, the defaults and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{QueryError, RetryPolicy};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("openalex-rs/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by every resource client of one registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,

    /// Contact address sent as the `mailto` header (polite pool).
    pub email: Option<String>,

    /// Premium API key, sent as the `api_key` query parameter.
    pub api_key: Option<String>,

    pub user_agent: String,

    /// Attempt budget per logical request. `0` issues no request at all.
    pub max_retries: u32,

    /// Base of the exponential back-off, in milliseconds.
    pub retry_backoff_factor: f64,

    /// HTTP statuses that are retried.
    pub retry_http_codes: Vec<u16>,

    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout_ms: u64,

    /// Idle time after which a connection is re-validated.
    pub session_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            email: None,
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_retries: 3,
            retry_backoff_factor: 0.2,
            retry_http_codes: vec![429, 500, 503],
            request_timeout_ms: 10_000,
            session_timeout_ms: 1_800_000,
        }
    }
}

impl ClientConfig {
    /// Checks the configuration for values that can never work.
    pub fn validate(&self) -> Result<(), QueryError> {
        let problem = if self.base_url.trim().is_empty() {
            Some("base_url must not be empty".to_owned())
        } else if self.user_agent.trim().is_empty() {
            Some("user_agent must not be empty".to_owned())
        } else if !self.retry_backoff_factor.is_finite() || self.retry_backoff_factor < 0.0 {
            Some(format!(
                "retry_backoff_factor must be a non-negative number, got {}",
                self.retry_backoff_factor
            ))
        } else {
            None
        };
        match problem {
            Some(message) => Err(QueryError::Configuration { message }),
            None => Ok(()),
        }
    }

    /// The immutable retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: self.retry_backoff_factor,
            retryable_status_codes: self.retry_http_codes.iter().copied().collect(),
        }
    }

    /// Headers every request carries, rebuilt from the current values.
    pub fn default_headers(&self) -> DefaultHeaders {
        let mut headers = vec![
            ("User-Agent".to_owned(), self.user_agent.clone()),
            ("Connection".to_owned(), "keep-alive".to_owned()),
        ];
        if let Some(email) = &self.email {
            headers.push(("mailto".to_owned(), email.clone()));
        }
        DefaultHeaders(headers)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

/// Ordered header list sent with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultHeaders(Vec<(String, String)>);

impl DefaultHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
