// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnection state machine.
//!
//! The controller decides when to connect and how long to wait after a
//! failure. It never touches the transport; the session performs the actual
//! connect and reports the outcome back.
//!
//! ```text
//! Disconnected --begin_attempt--> Connecting --on_connected--> Connected
//!       ^                             |                            |
//!       +--------on_failure-----------+-----------on_failure-------+
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Connection state values for atomic state field.
pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_CONNECTED: u8 = 2;

/// Where the connection lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => STATE_DISCONNECTED,
            ConnectionState::Connecting => STATE_CONNECTING,
            ConnectionState::Connected => STATE_CONNECTED,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CONNECTING => ConnectionState::Connecting,
            STATE_CONNECTED => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Connection state visible to the session task and its handles.
///
/// Uses atomic fields for lock-free reads from other tasks.
#[derive(Debug)]
pub struct SharedConnectionState {
    state: AtomicU8,
    attempt: AtomicU32,
    exhausted: AtomicBool,
}

impl SharedConnectionState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
            attempt: AtomicU32::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Consecutive failed attempts in the current cycle.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    fn set_exhausted(&self, exhausted: bool) {
        self.exhausted.store(exhausted, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        match self.get() {
            ConnectionState::Disconnected if self.is_exhausted() => {
                format!("disconnected (gave up after {} attempts)", self.attempt())
            }
            ConnectionState::Disconnected => {
                let attempt = self.attempt();
                if attempt > 0 {
                    format!("disconnected (retry {})", attempt)
                } else {
                    "disconnected".to_string()
                }
            }
            ConnectionState::Connecting => "connecting".to_string(),
            ConnectionState::Connected => "connected".to_string(),
        }
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before the next attempt after `failures` consecutive failures:
    /// `min(initial * 2^failures, max)`.
    pub fn delay(&self, failures: u32) -> Duration {
        1u32.checked_shl(failures)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// What to do after a failed or dropped connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after this delay.
    RetryAfter(Duration),
    /// The attempt budget is spent. No retry is scheduled.
    Exhausted { attempts: u32 },
}

/// Owns the connection lifecycle and retry schedule.
#[derive(Debug)]
pub struct ReconnectController {
    state: ConnectionState,
    attempts: u32,
    /// Retries allowed per cycle; 0 means unlimited.
    max_attempts: u32,
    backoff: Backoff,
    exhausted: bool,
    retry_at: Option<Instant>,
    shared: Arc<SharedConnectionState>,
}

impl ReconnectController {
    pub fn new(backoff: Backoff, max_attempts: u32) -> Self {
        ReconnectController {
            state: ConnectionState::Disconnected,
            attempts: 0,
            max_attempts,
            backoff,
            exhausted: false,
            retry_at: None,
            shared: Arc::new(SharedConnectionState::new()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Shared view of the state for other tasks.
    pub fn shared(&self) -> Arc<SharedConnectionState> {
        Arc::clone(&self.shared)
    }

    /// When the scheduled retry is due, if one is scheduled.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Moves to `Connecting`. Returns false, changing nothing, while an
    /// attempt is in flight or the connection is up.
    pub fn begin_attempt(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            return false;
        }
        self.retry_at = None;
        self.set_state(ConnectionState::Connecting);
        true
    }

    /// Records a successful connect and resets the backoff.
    pub fn on_connected(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
        self.retry_at = None;
        self.shared.set_attempt(0);
        self.shared.set_exhausted(false);
        self.set_state(ConnectionState::Connected);
    }

    /// Records a failed attempt or a dropped connection and decides whether
    /// to retry.
    pub fn on_failure(&mut self) -> RetryDecision {
        self.set_state(ConnectionState::Disconnected);
        self.attempts = self.attempts.saturating_add(1);
        self.shared.set_attempt(self.attempts);

        if self.max_attempts > 0 && self.attempts > self.max_attempts {
            self.exhausted = true;
            self.retry_at = None;
            self.shared.set_exhausted(true);
            return RetryDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        let delay = self.backoff.delay(self.attempts);
        self.retry_at = Some(Instant::now() + delay);
        RetryDecision::RetryAfter(delay)
    }

    /// Starts a fresh cycle after the budget ran out.
    pub fn reset_cycle(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
        self.shared.set_attempt(0);
        self.shared.set_exhausted(false);
    }

    /// Full teardown: disconnected, no retry pending, fresh cycle.
    pub fn shutdown(&mut self) {
        self.retry_at = None;
        self.reset_cycle();
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "connection state");
        }
        self.state = state;
        self.shared.set(state);
    }
}

#[cfg(test)]
#[path = "reconnect_tests.rs"]
mod tests;
