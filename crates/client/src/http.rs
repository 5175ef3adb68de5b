//! `reqwest` implementation of the [`HttpTransport`] port.

use async_trait::async_trait;
use query::{ClientConfig, HttpRequest, HttpResponse, HttpTransport, QueryError, TransportFailure};
use serde_json::Value;
use tracing::debug;

/// Sends GET requests to `base_url` through one pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Builds the transport with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| QueryError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.get(&url).query(&request.params);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::new(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::new(e.to_string()))?;
        debug!(url = %url, status, bytes = text.len(), "Response received");

        Ok(HttpResponse {
            status,
            body: parse_body(&text),
        })
    }
}

/// Empty bodies become `null`; bodies that are not JSON are kept as text.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
