// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core timer types.
//!
//! This module contains the data exchanged with the remote timer authority:
//! TimerSnapshot, SavedTimerState, and the donation types used to add time.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::format::format_hms;

/// Direction a timer counts in. Fixed for the lifetime of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerType {
    /// Counts down towards zero and never goes below it.
    Countdown,
    /// Counts up from its initial value.
    Countup,
}

impl TimerType {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerType::Countdown => "COUNTDOWN",
            TimerType::Countup => "COUNTUP",
        }
    }
}

impl fmt::Display for TimerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "COUNTDOWN" => Ok(TimerType::Countdown),
            "COUNTUP" => Ok(TimerType::Countup),
            _ => Err(Error::InvalidTimerType(s.to_string())),
        }
    }
}

/// Run status reported by the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStatus {
    Running,
    Paused,
    Stopped,
}

impl TimerStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Running => "RUNNING",
            TimerStatus::Paused => "PAUSED",
            TimerStatus::Stopped => "STOPPED",
        }
    }

    /// True while the timer is advancing.
    pub fn is_active(&self) -> bool {
        matches!(self, TimerStatus::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, TimerStatus::Paused)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TimerStatus::Stopped)
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "RUNNING" => Ok(TimerStatus::Running),
            "PAUSED" => Ok(TimerStatus::Paused),
            "STOPPED" => Ok(TimerStatus::Stopped),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Accepts any finite JSON number and truncates it to whole seconds.
fn whole_seconds<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(de::Error::custom("currentTime must be a finite number"));
    }
    Ok(value.trunc() as i64)
}

/// Complete description of a timer at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Stable identifier of the logical timer.
    pub timer_key: String,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_name: Option<String>,
    /// Seconds remaining (countdown) or elapsed (count-up).
    #[serde(deserialize_with = "whole_seconds")]
    pub current_time: i64,
    pub status: TimerStatus,
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    /// Server timestamp used for staleness comparison.
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_minutes: Option<i64>,
    /// Display string precomputed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_time: Option<String>,
}

impl TimerSnapshot {
    /// Creates a snapshot with no optional fields set.
    pub fn new(
        timer_key: impl Into<String>,
        timer_type: TimerType,
        status: TimerStatus,
        current_time: i64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        TimerSnapshot {
            timer_key: timer_key.into(),
            timer_name: None,
            current_time,
            status,
            timer_type,
            last_updated,
            target_minutes: None,
            formatted_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.status.is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.status.is_stopped()
    }

    /// True for a running countdown that has reached zero.
    pub fn countdown_expired(&self) -> bool {
        self.timer_type == TimerType::Countdown && self.current_time == 0 && self.is_active()
    }

    /// Text to show on the overlay: the server's string if it sent one.
    pub fn display_time(&self) -> String {
        match &self.formatted_time {
            Some(formatted) => formatted.clone(),
            None => format_hms(self.current_time),
        }
    }
}

/// A named snapshot stored by the remote authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTimerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    /// Older servers identify saved states by timer key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    #[serde(deserialize_with = "whole_seconds")]
    pub current_time: i64,
    pub status: TimerStatus,
    pub last_updated: DateTime<Utc>,
}

impl SavedTimerState {
    /// Identifier to pass back when loading this state.
    pub fn id(&self) -> Option<&str> {
        self.state_id.as_deref().or(self.timer_key.as_deref())
    }
}

/// Key and display name of the timer a session controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerIdentity {
    pub key: String,
    pub name: String,
}

impl TimerIdentity {
    /// Creates an identity. The key must not be blank.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("timer key cannot be empty".to_string()));
        }
        Ok(TimerIdentity {
            key,
            name: name.into(),
        })
    }

    /// The name as sent on the wire; blank names are omitted.
    pub fn wire_name(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            None
        } else {
            Some(self.name.clone())
        }
    }
}

/// Source of a donation that adds time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationType {
    Bits,
    Raid,
    Subscription,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::Bits => "BITS",
            DonationType::Raid => "RAID",
            DonationType::Subscription => "SUBSCRIPTION",
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DonationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BITS" => Ok(DonationType::Bits),
            "RAID" => Ok(DonationType::Raid),
            "SUBSCRIPTION" | "SUB" => Ok(DonationType::Subscription),
            _ => Err(Error::InvalidDonationType(s.to_string())),
        }
    }
}

/// Attribution attached to an add-time command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationMetadata {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotes: Option<Vec<String>>,
    /// Bit count, BITS only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<u32>,
    /// Raiding viewer count, RAID only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u32>,
}

/// A donation: its type plus attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donation {
    pub kind: DonationType,
    pub metadata: DonationMetadata,
}

impl Donation {
    fn with_kind(kind: DonationType, username: impl Into<String>) -> Self {
        Donation {
            kind,
            metadata: DonationMetadata {
                username: username.into(),
                message: None,
                emotes: None,
                bits: None,
                viewers: None,
            },
        }
    }

    /// A cheer of `bits` bits.
    pub fn bits(username: impl Into<String>, bits: u32) -> Self {
        let mut donation = Self::with_kind(DonationType::Bits, username);
        donation.metadata.bits = Some(bits);
        donation
    }

    /// A raid bringing `viewers` viewers.
    pub fn raid(username: impl Into<String>, viewers: u32) -> Self {
        let mut donation = Self::with_kind(DonationType::Raid, username);
        donation.metadata.viewers = Some(viewers);
        donation
    }

    pub fn subscription(username: impl Into<String>) -> Self {
        Self::with_kind(DonationType::Subscription, username)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.metadata.message = Some(message.into());
        self
    }

    pub fn with_emotes(mut self, emotes: Vec<String>) -> Self {
        self.metadata.emotes = Some(emotes);
        self
    }

    /// Checks the attribution fields required for this donation type.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.username.trim().is_empty() {
            return Err(Error::InvalidInput(
                "donation username cannot be empty".to_string(),
            ));
        }
        match self.kind {
            DonationType::Bits if self.metadata.bits.is_none() => Err(Error::InvalidInput(
                "BITS donations require a bit count".to_string(),
            )),
            DonationType::Raid if self.metadata.viewers.is_none() => Err(Error::InvalidInput(
                "RAID donations require a viewer count".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// One entry of a timer's donation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    #[serde(rename = "type")]
    pub kind: DonationType,
    pub minutes_added: f64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u32>,
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
