//! Connection Supervisor
//!
//! Connection state of the printer session and the fixed-interval reconnect
//! policy. Reconnection is polled from the tick; there is no timer to cancel,
//! a due attempt simply becomes a no-op once a session is up.

use serde::Serialize;

use crate::constants::DEFAULT_RECONNECT_INTERVAL_MS;
use crate::helpers::{Millis, elapsed};

/// Connection state of the client
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Required settings missing, no event storage
    #[default]
    Unconfigured,
    /// Settings valid and storage allocated, never connected
    Ready,
    /// Session open in flight or lost and awaiting reconnect
    Connecting,
    /// Session established and subscribed
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Unconfigured => "Unconfigured",
            ConnectionState::Ready => "Ready",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    /// Whether the client may try to open a session in this state
    pub fn can_connect(&self) -> bool {
        matches!(self, ConnectionState::Ready | ConnectionState::Connecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-interval reconnect policy: no growth, no attempt cap
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    interval: Millis,
    last_attempt: Option<Millis>,
    /// An attempt was made outside the tick and has no timestamp yet
    unstamped: bool,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(interval: Millis) -> Self {
        Self {
            interval,
            last_attempt: None,
            unstamped: false,
            attempts: 0,
        }
    }

    /// Whether the interval has passed since the last attempt
    pub fn due(&self, now: Millis) -> bool {
        !self.unstamped
            && self
                .last_attempt
                .is_none_or(|last| elapsed(now, last) > self.interval)
    }

    /// Record an attempt made at `now`; returns the attempt number
    pub fn record_attempt(&mut self, now: Millis) -> u32 {
        self.last_attempt = Some(now);
        self.unstamped = false;
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Record an attempt made without a clock reading (on configure). It
    /// counts from the next [`stamp`](Self::stamp).
    pub fn record_untimed_attempt(&mut self) -> u32 {
        self.unstamped = true;
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Give a pending untimed attempt the timestamp `now`
    pub fn stamp(&mut self, now: Millis) {
        if self.unstamped {
            self.last_attempt = Some(now);
            self.unstamped = false;
        }
    }

    /// Forget past attempts after a session was established
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.unstamped = false;
    }

    pub fn interval(&self) -> Millis {
        self.interval
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_due() {
        let policy = ReconnectPolicy::default();
        assert!(policy.due(0));
    }

    #[test]
    fn test_fixed_interval() {
        let mut policy = ReconnectPolicy::new(2_000);
        assert_eq!(policy.record_attempt(1_000), 1);
        assert!(!policy.due(2_000));
        assert!(!policy.due(3_000));
        assert!(policy.due(3_001));

        assert_eq!(policy.record_attempt(3_001), 2);
        assert!(!policy.due(5_001));
        assert!(policy.due(5_002));
    }

    #[test]
    fn test_due_across_wraparound() {
        let mut policy = ReconnectPolicy::new(2_000);
        policy.record_attempt(Millis::MAX - 500);
        assert!(!policy.due(1_000));
        assert!(policy.due(1_600));
    }

    #[test]
    fn test_reset_keeps_interval() {
        let mut policy = ReconnectPolicy::new(500);
        policy.record_attempt(0);
        policy.record_attempt(600);
        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.interval(), 500);
    }

    #[test]
    fn test_untimed_attempt_waits_full_interval() {
        let mut policy = ReconnectPolicy::new(2_000);
        assert_eq!(policy.record_untimed_attempt(), 1);
        assert!(!policy.due(0));

        policy.stamp(500);
        assert!(!policy.due(2_500));
        assert!(policy.due(2_501));

        policy.stamp(2_501);
        assert!(policy.due(2_501));
    }

    #[test]
    fn test_reset_clears_untimed_attempt() {
        let mut policy = ReconnectPolicy::new(2_000);
        policy.record_untimed_attempt();
        policy.reset();
        assert!(policy.due(0));
    }

    #[test]
    fn test_connect_allowed_states() {
        assert!(!ConnectionState::Unconfigured.can_connect());
        assert!(ConnectionState::Ready.can_connect());
        assert!(ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
    }
}
