// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.
//!
//! [`SessionError`] is returned to callers of session methods. [`TimerError`]
//! is the payload fanned out to error subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};
use tk_core::RemoteError;

use crate::oneshot::OneShotError;

/// Machine-readable code carried by every [`TimerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The connection failed to open or dropped. Retried with backoff.
    ConnectionError,
    /// The retry budget ran out. Nothing retries until `ensure_connection`.
    MaxReconnectAttempts,
    /// An inbound payload failed validation or parsing and was discarded.
    TimerStateError,
    /// A one-shot request failed.
    RequestError,
    /// The authority pushed a `timer.error` event.
    RemoteError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionError => "CONNECTION_ERROR",
            ErrorCode::MaxReconnectAttempts => "MAX_RECONNECT_ATTEMPTS",
            ErrorCode::TimerStateError => "TIMER_STATE_ERROR",
            ErrorCode::RequestError => "REQUEST_ERROR",
            ErrorCode::RemoteError => "REMOTE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error event delivered to error subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerError {
    pub code: ErrorCode,
    pub message: String,
    /// The authority's own code, for [`ErrorCode::RemoteError`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_code: Option<String>,
}

impl TimerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TimerError {
            code,
            message: message.into(),
            remote_code: None,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionError, message)
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TimerStateError, message)
    }

    pub fn max_attempts(attempts: u32) -> Self {
        Self::new(
            ErrorCode::MaxReconnectAttempts,
            format!("gave up reconnecting after {} attempts", attempts),
        )
    }
}

impl From<RemoteError> for TimerError {
    fn from(err: RemoteError) -> Self {
        TimerError {
            code: ErrorCode::RemoteError,
            message: err.message,
            remote_code: Some(err.code),
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A local precondition failed. Nothing was sent or queued.
    #[error("{0}")]
    InvalidInput(String),

    #[error("request error: {0}")]
    Request(#[from] OneShotError),

    /// The authority answered with something that is not a usable snapshot.
    #[error("invalid timer state: {0}")]
    InvalidState(String),

    /// The session task has shut down.
    #[error("session closed")]
    Closed,
}

impl From<tk_core::Error> for SessionError {
    fn from(err: tk_core::Error) -> Self {
        SessionError::InvalidInput(err.to_string())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
