//! Connection health monitoring.
//!
//! Before every request the monitor decides whether the session is stale
//! (idle past the session timeout, or explicitly inactive). A stale session
//! is probed with `GET /`; the caller repairs the connection when the probe
//! fails.

use query::{
    ConnectionState, DefaultHeaders, HttpRequest, HttpTransport, ResourceKind, Timestamp,
};
use tracing::{error, info, warn};

/// Result of a pre-request health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheck {
    /// The session was recent and active; no probe was issued.
    Fresh,
    /// The session was stale and the probe answered 200.
    Healthy,
    /// The probe failed; the connection is now marked inactive.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ConnectionHealthMonitor {
    resource: ResourceKind,
    state: ConnectionState,
}

impl ConnectionHealthMonitor {
    pub fn new(resource: ResourceKind, state: ConnectionState) -> Self {
        Self { resource, state }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Probes the root path if the session is stale.
    pub async fn check(
        &mut self,
        transport: &dyn HttpTransport,
        headers: &DefaultHeaders,
    ) -> HealthCheck {
        let now = Timestamp::now();
        if !self.state.needs_probe(now) {
            return HealthCheck::Fresh;
        }
        warn!(
            resource = %self.resource,
            age_ms = self.state.age_millis(now),
            active = self.state.is_active(),
            "Session stale"
        );

        let probe = HttpRequest::new("/", headers.clone());
        match transport.get(&probe).await {
            Ok(response) if response.status == 200 => {
                self.state.mark_healthy(now);
                HealthCheck::Healthy
            }
            Ok(response) => {
                warn!(resource = %self.resource, status = response.status, "Health check failed");
                self.state.mark_inactive();
                HealthCheck::Failed
            }
            Err(failure) => {
                error!(resource = %self.resource, error = %failure, "Health check exception");
                self.state.mark_inactive();
                HealthCheck::Failed
            }
        }
    }

    /// Marks the connection usable again after the caller rebuilt headers.
    pub fn reinitialize(&mut self) {
        info!(resource = %self.resource, "Reinitializing headers");
        self.state.reinitialize();
    }

    /// Records a successful request.
    pub fn touch(&mut self) {
        self.state.touch();
    }

    /// Records activity at `at`.
    pub fn touch_at(&mut self, at: Timestamp) {
        self.state.touch_at(at);
    }

    /// Forces a probe on the next request.
    pub fn close(&mut self) {
        self.state.close();
    }
}
