//! Error, error-record and retry-policy types for the query domain.
//!
//! [`QueryError`] covers every condition a caller can observe from the
//! engine. Transport failures are carried as an [`ErrorRecord`], a plain
//! data value describing what the server (or the network) reported, while
//! malformed input such as an over-nested filter is rejected before any
//! request is made.
//!
//! [`RetryPolicy`] is the immutable per-client retry configuration; it turns
//! an HTTP status into a [`RetryDecision`].

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message carried by the record returned once the attempt budget is spent.
pub const MAX_RETRIES_MESSAGE: &str = "Max retries reached.";

/// Maximum number of identifiers accepted by a batch `fetch_by_ids` call.
pub const MAX_BATCH_IDENTIFIERS: usize = 100;

// ---------------------------------------------------------------------------
// Error records
// ---------------------------------------------------------------------------

/// A failed request, described as data.
///
/// `status` is the HTTP status of the failed response, or `0` when no
/// response was received at all (connection refused, timeout) and for the
/// generic exhausted-retry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable description of the failure.
    pub message: String,

    /// HTTP status code, `0` when there was no response.
    pub status: u16,

    /// Response body or other structured context, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorRecord {
    /// Creates a record without details.
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
            details: None,
        }
    }

    /// Attaches structured details to the record.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The record returned when the retry budget is exhausted.
    ///
    /// The message and status are fixed. When at least one attempt was made
    /// the last concrete failure is kept under `details.last_error`.
    pub fn max_retries_reached(last_error: Option<&ErrorRecord>) -> Self {
        let record = Self::new(MAX_RETRIES_MESSAGE, 0);
        match last_error.and_then(|last| serde_json::to_value(last).ok()) {
            Some(last) => record.with_details(serde_json::json!({ "last_error": last })),
            None => record,
        }
    }

    /// Returns `true` if this is the generic exhausted-retry record.
    pub fn is_max_retries(&self) -> bool {
        self.status == 0 && self.message == MAX_RETRIES_MESSAGE
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (status {})", self.message, self.status)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Every failure the engine can report to a caller.
///
/// `FilterShape`, `TooManyIdentifiers` and `InvalidFilter` are raised before
/// any request is issued. `Transport` carries the record of a failed request.
/// `Pagination` terminates an active pagination run.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum QueryError {
    /// A nested filter value is more than one level deep.
    #[error("Unsupported nested object in filter: {path}")]
    FilterShape {
        /// Dotted path of the offending value (e.g. `"a.b"`).
        path: String,
    },

    /// A batch lookup named more identifiers than the API accepts.
    #[error("Cannot fetch {count} identifiers in one request (limit {limit})")]
    TooManyIdentifiers {
        /// Number of identifiers supplied.
        count: usize,
        /// Maximum accepted.
        limit: usize,
    },

    /// A dynamically built filter could not be interpreted as a filter map.
    #[error("Invalid filter: {message}")]
    InvalidFilter {
        /// Description of the problem.
        message: String,
    },

    /// The request failed; the record describes the failure.
    #[error("Request failed: {0}")]
    Transport(ErrorRecord),

    /// A fetch inside an active pagination run failed.
    #[error("Pagination failed: {message}")]
    Pagination {
        /// Message of the underlying failure.
        message: String,
        /// The failure record.
        record: ErrorRecord,
    },

    /// A payload or item could not be decoded into the requested shape.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// The client configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The resource kind has no such sub-resource.
    #[error("Resource '{resource}' has no sub-resource '{sub_resource}'")]
    NoSubResource {
        /// Resource kind the call was made on.
        resource: String,
        /// Requested sub-resource.
        sub_resource: String,
    },
}

impl QueryError {
    /// Returns the failure record for transport and pagination failures.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Transport(record) | Self::Pagination { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Wraps a failure record observed during pagination.
    pub fn pagination(record: ErrorRecord) -> Self {
        Self::Pagination {
            message: record.message.clone(),
            record,
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failed attempt may be retried and, if so, after what delay.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// The attempt may be repeated after sleeping for `after`.
    Retryable {
        /// Back-off to apply before the next attempt.
        after: Duration,
    },
    /// The failure must be returned to the caller immediately.
    NonRetryable,
}

/// Bounded retry configuration for one client.
///
/// `max_retries` is the total attempt budget: with `max_retries = 0` no
/// request is issued at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempt budget.
    pub max_retries: u32,
    /// Base of the exponential back-off, in milliseconds.
    pub backoff_factor: f64,
    /// HTTP statuses that may be retried. `0` stands for "no response".
    pub retryable_status_codes: BTreeSet<u16>,
}

impl RetryPolicy {
    /// Back-off before retrying after failed attempt number `attempt`
    /// (zero-based): `backoff_factor * 2^attempt` milliseconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let millis = self.backoff_factor * 2f64.powi(attempt.min(30) as i32);
        if millis.is_finite() && millis > 0.0 {
            Duration::from_nanos((millis * 1_000_000.0).round() as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Classifies a failed attempt.
    pub fn decide(&self, status: u16, attempt: u32) -> RetryDecision {
        if self.retryable_status_codes.contains(&status) && attempt < self.max_retries {
            RetryDecision::Retryable {
                after: self.backoff(attempt),
            }
        } else {
            RetryDecision::NonRetryable
        }
    }
}
