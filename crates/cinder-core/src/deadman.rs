//! Dead-man's switch
//!
//! Tracks the last observed operator interaction against a monotonic
//! clock. The driver touches the switch on every interaction and
//! periodically checks `expired()`; on expiry it burns the session.
//! Burn idempotence makes "at most one burn per crossing" free: once
//! the session is gone there is nothing left to burn.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Inactivity-triggered burn policy.
pub struct DeadManSwitch {
    timeout: Duration,
    last_activity: Mutex<Instant>,
}

impl DeadManSwitch {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Record an operator interaction, resetting the countdown.
    pub fn touch(&self) {
        let mut last = self
            .last_activity
            .lock()
            .expect("dead-man's switch lock poisoned");
        *last = Instant::now();
    }

    /// Time since the last recorded interaction.
    pub fn idle(&self) -> Duration {
        self.last_activity
            .lock()
            .expect("dead-man's switch lock poisoned")
            .elapsed()
    }

    /// Whether the inactivity window has been exceeded.
    pub fn expired(&self) -> bool {
        self.idle() >= self.timeout
    }

    /// The configured inactivity window.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
