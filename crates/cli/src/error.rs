// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the `tock` binary.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}\n  hint: create it, or omit --config to use the defaults")]
    ConfigNotFound(String),

    #[error("could not connect to {0}\n  hint: check ws_url in the config file, or retry with --via oneshot")]
    Unreachable(String),

    #[error("timer not found: {0}\n  hint: run 'tock create' first")]
    TimerNotFound(String),

    #[error("no response from the timer service within {0}s")]
    NoResponse(u64),

    #[error(transparent)]
    Timer(#[from] tk_core::Error),

    #[error(transparent)]
    Session(#[from] tk_sync::SessionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
