// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tk_core::TimerType;

use crate::reconnect::Backoff;

/// Which path an intent takes to the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Via {
    /// The persistent connection, queued while disconnected.
    #[default]
    Live,
    /// A single request/response call.
    #[serde(alias = "http")]
    OneShot,
}

/// What the session sends when a running countdown reaches zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalAction {
    #[default]
    Pause,
    Stop,
}

/// Reconnection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Retries after consecutive failures before giving up (0 = unlimited).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 0 disables the watchdog.
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_watchdog_interval_ms() -> u64 {
    5000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.initial_delay_ms),
            max: Duration::from_secs(self.max_delay_secs),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `None` when the watchdog is disabled.
    pub fn watchdog_interval(&self) -> Option<Duration> {
        match self.watchdog_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Values used when `check_exists` has to create the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDefaults {
    #[serde(default = "default_timer_type")]
    pub timer_type: TimerType,
    #[serde(default = "default_initial_time_secs")]
    pub initial_time_secs: i64,
}

fn default_timer_type() -> TimerType {
    TimerType::Countdown
}

fn default_initial_time_secs() -> i64 {
    3600
}

impl Default for TimerDefaults {
    fn default() -> Self {
        TimerDefaults {
            timer_type: default_timer_type(),
            initial_time_secs: default_initial_time_secs(),
        }
    }
}

/// Everything a session needs besides its identity and transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub terminal_action: TerminalAction,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub defaults: TimerDefaults,
}

fn default_ws_url() -> String {
    "ws://localhost:3000/ws".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ws_url: default_ws_url(),
            terminal_action: TerminalAction::default(),
            reconnect: ReconnectConfig::default(),
            defaults: TimerDefaults::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
