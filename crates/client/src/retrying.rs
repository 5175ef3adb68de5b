//! One logical GET with connection repair, bounded retry and exponential
//! back-off.
//!
//! The attempt budget is `max_retries` *attempts*: with a budget of zero no
//! request is sent and the generic exhausted-retry record is returned.
//! Statuses outside the retryable set short-circuit without spending the
//! rest of the budget.

use std::sync::Arc;

use query::{
    ClientConfig, ConnectionState, DefaultHeaders, ErrorRecord, HttpRequest, HttpTransport,
    ResourceKind, RetryDecision, RetryPolicy,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::health::{ConnectionHealthMonitor, HealthCheck};

pub struct RetryingTransport {
    resource: ResourceKind,
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    policy: RetryPolicy,
    headers: DefaultHeaders,
    health: ConnectionHealthMonitor,
}

impl RetryingTransport {
    pub fn new(
        resource: ResourceKind,
        transport: Arc<dyn HttpTransport>,
        config: Arc<ClientConfig>,
    ) -> Self {
        let state = ConnectionState::new(config.session_timeout());
        Self {
            resource,
            transport,
            policy: config.retry_policy(),
            headers: config.default_headers(),
            health: ConnectionHealthMonitor::new(resource, state),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    pub fn connection(&self) -> &ConnectionState {
        self.health.state()
    }

    pub(crate) fn health_mut(&mut self) -> &mut ConnectionHealthMonitor {
        &mut self.health
    }

    /// Validates the session and repairs it when the probe fails.
    async fn ensure_connection(&mut self) {
        let check = self
            .health
            .check(self.transport.as_ref(), &self.headers)
            .await;
        if check == HealthCheck::Failed {
            self.headers = self.config.default_headers();
            self.health.reinitialize();
        }
    }

    /// Fetches `path` with `params`, retrying retryable statuses.
    pub async fn fetch(
        &mut self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, ErrorRecord> {
        self.ensure_connection().await;

        let request = HttpRequest::new(path, self.headers.clone()).with_params(params);
        let mut attempts: u32 = 0;
        let mut last_error: Option<ErrorRecord> = None;

        while attempts < self.policy.max_retries {
            debug!(resource = %self.resource, path, attempt = attempts, params = ?request.params, "Fetching");

            let record = match self.transport.get(&request).await {
                Ok(response) if response.is_success() => {
                    self.health.touch();
                    return Ok(response.body);
                }
                Ok(response) => {
                    let record = ErrorRecord::new(
                        format!("Request failed with status code {}", response.status),
                        response.status,
                    );
                    if response.body.is_null() {
                        record
                    } else {
                        record.with_details(response.body)
                    }
                }
                Err(failure) => ErrorRecord::new(failure.message, 0),
            };
            error!(
                resource = %self.resource,
                path,
                attempt = attempts,
                status = record.status,
                message = %record.message,
                "Fetch error"
            );

            match self.policy.decide(record.status, attempts) {
                RetryDecision::Retryable { after } => {
                    warn!(
                        resource = %self.resource,
                        retry = attempts + 1,
                        backoff_ms = after.as_secs_f64() * 1000.0,
                        status = record.status,
                        "Retrying"
                    );
                    tokio::time::sleep(after).await;
                    attempts += 1;
                    last_error = Some(record);
                }
                RetryDecision::NonRetryable => return Err(record),
            }
        }

        Err(ErrorRecord::max_retries_reached(last_error.as_ref()))
    }

    /// Marks the connection stale so the next request probes first.
    pub fn close(&mut self) {
        self.health.close();
    }
}

#[cfg(test)]
mod tests {
    use query::{HttpResponse, Timestamp, TransportFailure};
    use serde_json::json;

    use super::*;
    use crate::test_support::{init_tracing, ScriptedTransport};

    fn config(max_retries: u32) -> Arc<ClientConfig> {
        Arc::new(ClientConfig {
            max_retries,
            retry_backoff_factor: 0.2,
            email: Some("me@example.org".into()),
            ..ClientConfig::default()
        })
    }

    fn retrying(transport: &Arc<ScriptedTransport>, max_retries: u32) -> RetryingTransport {
        RetryingTransport::new(ResourceKind::Works, transport.clone(), config(max_retries))
    }

    #[tokio::test]
    async fn success_returns_body() {
        let transport = ScriptedTransport::shared();
        transport.ok("/works", json!({ "results": [] }));
        let mut retrying = retrying(&transport, 3);

        let body = retrying.fetch("/works", vec![]).await.unwrap();

        assert_eq!(body, json!({ "results": [] }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn retryable_statuses_spend_exactly_the_budget() {
        init_tracing();
        let transport = ScriptedTransport::shared();
        transport.status("/works", 503);
        let mut retrying = retrying(&transport, 4);

        let record = retrying.fetch("/works", vec![]).await.unwrap_err();

        assert_eq!(transport.requests_to("/works"), 4);
        assert_eq!(record.message, "Max retries reached.");
        assert_eq!(record.status, 0);
        assert_eq!(record.details.unwrap()["last_error"]["status"], 503);
    }

    #[tokio::test]
    async fn zero_budget_issues_no_request() {
        let transport = ScriptedTransport::shared();
        transport.ok("/works", json!({}));
        let mut retrying = retrying(&transport, 0);

        let record = retrying.fetch("/works", vec![]).await.unwrap_err();

        assert_eq!(transport.request_count(), 0);
        assert!(record.is_max_retries());
        assert!(record.details.is_none());
    }

    #[tokio::test]
    async fn non_retryable_status_short_circuits() {
        let transport = ScriptedTransport::shared();
        transport.status("/works", 404);
        let mut retrying = retrying(&transport, 5);

        let record = retrying.fetch("/works", vec![]).await.unwrap_err();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(record.status, 404);
        assert_eq!(record.message, "Request failed with status code 404");
        assert_eq!(record.details, Some(json!({ "error": "status 404" })));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let transport = ScriptedTransport::shared();
        transport.status("/works", 429);
        transport.status("/works", 500);
        transport.ok("/works", json!({ "ok": true }));
        let mut retrying = retrying(&transport, 3);

        let body = retrying.fetch("/works", vec![]).await.unwrap();

        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn network_failure_has_status_zero() {
        let transport = ScriptedTransport::shared();
        transport.respond("/works", Err(TransportFailure::new("connection refused")));
        let mut retrying = retrying(&transport, 3);

        let record = retrying.fetch("/works", vec![]).await.unwrap_err();

        assert_eq!(record, ErrorRecord::new("connection refused", 0));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn stale_session_with_failed_probe_reinitializes_once() {
        init_tracing();
        let transport = ScriptedTransport::shared();
        transport.respond("/", Ok(HttpResponse { status: 503, body: Value::Null }));
        transport.ok("/works", json!({ "results": [] }));
        let mut retrying = retrying(&transport, 3);
        let timeout_ms = retrying.connection().session_timeout().as_millis() as i64;
        retrying
            .health_mut()
            .touch_at(Timestamp::now().minus_millis(timeout_ms + 1));

        retrying.fetch("/works", vec![]).await.unwrap();

        assert_eq!(retrying.connection().reinitializations(), 1);
        assert!(retrying.connection().is_active());
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/");
        assert_eq!(requests[1].path, "/works");
        assert_eq!(requests[1].headers.get("mailto"), Some("me@example.org"));
    }

    #[tokio::test]
    async fn unreachable_probe_reinitializes_once_before_the_request() {
        init_tracing();
        let transport = ScriptedTransport::shared();
        transport.respond("/", Err(TransportFailure::new("connection reset")));
        transport.ok("/works", json!({ "results": [] }));
        let mut retrying = retrying(&transport, 3);
        let timeout_ms = retrying.connection().session_timeout().as_millis() as i64;
        retrying
            .health_mut()
            .touch_at(Timestamp::now().minus_millis(timeout_ms + 1));

        let body = retrying.fetch("/works", vec![]).await.unwrap();

        assert_eq!(body, json!({ "results": [] }));
        assert_eq!(retrying.connection().reinitializations(), 1);
        assert!(retrying.connection().is_active());
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/");
        assert_eq!(requests[1].path, "/works");
        assert_eq!(requests[1].headers, retrying.config().default_headers());
        assert_eq!(requests[1].headers.get("mailto"), Some("me@example.org"));
    }

    #[tokio::test]
    async fn close_forces_a_probe_on_reuse() {
        let transport = ScriptedTransport::shared();
        transport.ok("/", json!({}));
        transport.ok("/works", json!({}));
        let mut retrying = retrying(&transport, 3);

        retrying.close();
        retrying.fetch("/works", vec![]).await.unwrap();

        assert_eq!(transport.requests_to("/"), 1);
        assert_eq!(retrying.connection().reinitializations(), 0);
    }
}
