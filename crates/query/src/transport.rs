//! The HTTP transport port.
//!
//! The domain crate defines *what* a transport must do; the client crate
//! supplies a `reqwest` implementation and tests supply scripted ones.
//!
//! Any HTTP status is a successful *transport* outcome and is returned as
//! data in [`HttpResponse`]; only failures without a response (connection
//! refused, timeout, unreadable body) are [`TransportFailure`]s.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::DefaultHeaders;

/// One GET request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Absolute path beginning with `/` (e.g. `"/works/random"`).
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: DefaultHeaders,
}

impl HttpRequest {
    pub fn new(path: impl Into<String>, headers: DefaultHeaders) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
            headers,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }
}

/// A received response. `body` is `Value::Null` for an empty body and a
/// JSON string for a body that is not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Issues GET requests against the API root.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;
}
