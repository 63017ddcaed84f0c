// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Read from `$XDG_CONFIG_HOME/tock/config.toml` unless `--config` names
//! another file. A missing default file means every key takes its default:
//! - `ws_url`, `http_url`: where the timer service lives
//! - `timer_key`, `timer_name`: which timer to drive
//! - `prefer`: `live` or `oneshot`, the path commands take by default
//! - `terminal_action`, `[reconnect]`, `[defaults]`: session behavior

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tk_core::TimerIdentity;
use tk_sync::{SessionConfig, Via};

use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "tock";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL for one-shot HTTP requests.
    #[serde(default = "default_http_url")]
    pub http_url: String,
    #[serde(default = "default_timer_key")]
    pub timer_key: String,
    /// Display name sent with commands. Empty means none.
    #[serde(default = "default_timer_name")]
    pub timer_name: String,
    /// Path taken by commands when `--via` is not given.
    #[serde(default)]
    pub prefer: Via,
    /// WebSocket URL, terminal action, reconnection and create defaults.
    #[serde(flatten)]
    pub session: SessionConfig,
}

fn default_http_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timer_key() -> String {
    "main-timer".to_string()
}

fn default_timer_name() -> String {
    "Main Timer".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            http_url: default_http_url(),
            timer_key: default_timer_key(),
            timer_name: default_timer_name(),
            prefer: Via::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub key: Option<String>,
    pub name: Option<String>,
    pub http: Option<String>,
    pub via: Option<Via>,
}

impl Config {
    /// Loads the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Loads `explicit` if given (it must exist), otherwise the default
    /// path if present, otherwise the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::ConfigNotFound(path.display().to_string()));
            }
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Config::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(key) = overrides.key {
            self.timer_key = key;
        }
        if let Some(name) = overrides.name {
            self.timer_name = name;
        }
        if let Some(http) = overrides.http {
            self.http_url = http;
        }
        if let Some(via) = overrides.via {
            self.prefer = via;
        }
    }

    /// The timer this config drives.
    pub fn identity(&self) -> Result<TimerIdentity> {
        Ok(TimerIdentity::new(&self.timer_key, &self.timer_name)?)
    }
}

/// `$XDG_CONFIG_HOME/tock/config.toml`, or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
