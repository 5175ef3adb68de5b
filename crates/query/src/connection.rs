//! Connection liveness bookkeeping.
//!
//! [`ConnectionState`] only records facts; probing the server is done by the
//! client crate's health monitor, which consults [`ConnectionState::needs_probe`]
//! before every request.

use std::time::Duration;

use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    last_activity: Timestamp,
    is_active: bool,
    session_timeout: Duration,
    reinitializations: u64,
}

impl ConnectionState {
    /// A fresh, active connection whose last activity is now.
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            last_activity: Timestamp::now(),
            is_active: true,
            session_timeout,
            reinitializations: 0,
        }
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Number of times the connection was rebuilt after a failed probe.
    pub fn reinitializations(&self) -> u64 {
        self.reinitializations
    }

    /// Milliseconds since the last recorded activity.
    pub fn age_millis(&self, now: Timestamp) -> i64 {
        self.last_activity.millis_until(now)
    }

    /// `true` when the session is older than the timeout or marked inactive.
    pub fn needs_probe(&self, now: Timestamp) -> bool {
        let timeout = i64::try_from(self.session_timeout.as_millis()).unwrap_or(i64::MAX);
        !self.is_active || self.age_millis(now) > timeout
    }

    /// Records activity at `at`.
    pub fn touch_at(&mut self, at: Timestamp) {
        self.last_activity = at;
    }

    /// Records activity now.
    pub fn touch(&mut self) {
        self.touch_at(Timestamp::now());
    }

    /// A successful probe: active again, activity refreshed.
    pub fn mark_healthy(&mut self, at: Timestamp) {
        self.is_active = true;
        self.last_activity = at;
    }

    pub fn mark_inactive(&mut self) {
        self.is_active = false;
    }

    /// After headers were rebuilt: active, activity reset, counter bumped.
    pub fn reinitialize(&mut self) {
        self.is_active = true;
        self.last_activity = Timestamp::now();
        self.reinitializations += 1;
    }

    /// Forces a probe on next use.
    pub fn close(&mut self) {
        self.last_activity = Timestamp::epoch();
        self.is_active = false;
    }
}
