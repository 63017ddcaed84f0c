// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot request/response calls to the timer authority.
//!
//! Used for initial hydration, existence checks, donation history, and as an
//! alternative path for commands when the caller prefers it over the
//! persistent connection.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tk_core::protocol::unwrap_list;
use tk_core::{ClientMessage, DonationRecord, SavedTimerState, TimerIdentity};

/// Error type for one-shot calls.
#[derive(Debug, thiserror::Error)]
pub enum OneShotError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Result type for one-shot calls.
pub type OneShotResult<T> = Result<T, OneShotError>;

type Call<'a, T> = Pin<Box<dyn Future<Output = OneShotResult<T>> + Send + 'a>>;

/// Request/response access to the authority.
pub trait OneShot: Send + Sync {
    /// Sends a command. Returns the response body if it was JSON.
    fn send_command<'a>(&'a self, msg: &'a ClientMessage) -> Call<'a, Option<Value>>;

    /// Fetches the raw snapshot payload. Returns `None` if the timer does not exist.
    fn fetch_state<'a>(&'a self, identity: &'a TimerIdentity) -> Call<'a, Option<Value>>;

    /// Fetches the saved states stored for this timer key.
    fn fetch_saved_states<'a>(
        &'a self,
        identity: &'a TimerIdentity,
    ) -> Call<'a, Vec<SavedTimerState>>;

    /// Fetches the donation history for this timer.
    fn fetch_donations<'a>(&'a self, identity: &'a TimerIdentity)
        -> Call<'a, Vec<DonationRecord>>;
}

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of [`OneShot`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base: Url,
}

impl HttpRemote {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: &str) -> OneShotResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> OneShotResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| OneShotError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(OneShotError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpRemote { client, base })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> OneShotResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| OneShotError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST {base}/timer/{route}`
    pub fn command_url(&self, msg: &ClientMessage) -> OneShotResult<Url> {
        self.url(&["timer", msg.route()])
    }

    /// `GET {base}/timer/state/{key}/{name}`
    pub fn state_url(&self, identity: &TimerIdentity) -> OneShotResult<Url> {
        self.url(&["timer", "state", &identity.key, &identity.name])
    }

    /// `GET {base}/timer/saved-states/{key}`
    pub fn saved_states_url(&self, identity: &TimerIdentity) -> OneShotResult<Url> {
        self.url(&["timer", "saved-states", &identity.key])
    }

    /// `GET {base}/timer/donations/{key}/{name}`
    pub fn donations_url(&self, identity: &TimerIdentity) -> OneShotResult<Url> {
        self.url(&["timer", "donations", &identity.key, &identity.name])
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> OneShotResult<Vec<T>> {
        let response = checked(self.client.get(url).send().await?).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| OneShotError::Decode(e.to_string()))?;
        serde_json::from_value(unwrap_list(body)).map_err(|e| OneShotError::Decode(e.to_string()))
    }
}

/// Turns a non-success response into [`OneShotError::Status`].
async fn checked(response: reqwest::Response) -> OneShotResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read body>".into());
    Err(OneShotError::Status {
        status: status.as_u16(),
        body,
    })
}

impl OneShot for HttpRemote {
    fn send_command<'a>(&'a self, msg: &'a ClientMessage) -> Call<'a, Option<Value>> {
        Box::pin(async move {
            let url = self.command_url(msg)?;
            let body = msg.body().map_err(|e| OneShotError::Decode(e.to_string()))?;
            tracing::debug!(route = msg.route(), "sending one-shot command");

            let response = checked(self.client.post(url).json(&body).send().await?).await?;
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            Ok(serde_json::from_str(&text).ok())
        })
    }

    fn fetch_state<'a>(&'a self, identity: &'a TimerIdentity) -> Call<'a, Option<Value>> {
        Box::pin(async move {
            let url = self.state_url(identity)?;
            let response = self.client.get(url).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = checked(response).await?;
            let body = response
                .json()
                .await
                .map_err(|e| OneShotError::Decode(e.to_string()))?;
            Ok(Some(body))
        })
    }

    fn fetch_saved_states<'a>(
        &'a self,
        identity: &'a TimerIdentity,
    ) -> Call<'a, Vec<SavedTimerState>> {
        Box::pin(async move { self.get_list(self.saved_states_url(identity)?).await })
    }

    fn fetch_donations<'a>(
        &'a self,
        identity: &'a TimerIdentity,
    ) -> Call<'a, Vec<DonationRecord>> {
        Box::pin(async move { self.get_list(self.donations_url(identity)?).await })
    }
}

#[cfg(test)]
#[path = "oneshot_tests.rs"]
mod tests;
