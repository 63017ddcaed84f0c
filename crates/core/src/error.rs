// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tk-core operations.

use thiserror::Error;

/// All possible errors that can occur in tk-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid timer type: '{0}'\n  hint: valid types are: countdown, countup")]
    InvalidTimerType(String),

    #[error("invalid timer status: '{0}'\n  hint: valid statuses are: running, paused, stopped")]
    InvalidStatus(String),

    #[error("invalid donation type: '{0}'\n  hint: valid types are: bits, raid, subscription")]
    InvalidDonationType(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tk-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
