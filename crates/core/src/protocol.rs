// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol messages for client-authority communication.
//!
//! The protocol is simple:
//! - Client sends named commands, each carrying its own arguments
//! - Authority pushes events inside a `{channel, kind, payload}` envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timer::{Donation, DonationMetadata, DonationType, TimerIdentity, TimerType};

/// Arguments shared by the simple lifecycle commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCommand {
    pub timer_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimer {
    pub timer_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub timer_type: Option<TimerType>,
    /// Initial value in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTime {
    pub timer_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_name: Option<String>,
    pub minutes: u32,
    #[serde(rename = "type")]
    pub kind: DonationType,
    pub metadata: DonationMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub timer_key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadState {
    pub timer_key: String,
    /// Omitted to load the most recent saved state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRef {
    pub timer_key: String,
}

/// Commands sent from client to authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateTimer(CreateTimer),
    StartTimer(TimerCommand),
    StopTimer(TimerCommand),
    PauseTimer(TimerCommand),
    ResumeTimer(TimerCommand),
    ResetTimer(TimerCommand),
    AddTime(AddTime),
    SaveState(SaveState),
    LoadState(LoadState),
    GetSavedStates(TimerRef),
    GetTimerState(TimerCommand),
}

fn command(identity: &TimerIdentity) -> TimerCommand {
    TimerCommand {
        timer_key: identity.key.clone(),
        timer_name: identity.wire_name(),
    }
}

impl ClientMessage {
    /// Creates a CreateTimer message.
    pub fn create(
        identity: &TimerIdentity,
        timer_type: TimerType,
        initial_time: Option<i64>,
    ) -> Self {
        ClientMessage::CreateTimer(CreateTimer {
            timer_key: identity.key.clone(),
            timer_name: identity.wire_name(),
            timer_type: Some(timer_type),
            initial_time,
        })
    }

    pub fn start(identity: &TimerIdentity) -> Self {
        ClientMessage::StartTimer(command(identity))
    }

    pub fn stop(identity: &TimerIdentity) -> Self {
        ClientMessage::StopTimer(command(identity))
    }

    pub fn pause(identity: &TimerIdentity) -> Self {
        ClientMessage::PauseTimer(command(identity))
    }

    pub fn resume(identity: &TimerIdentity) -> Self {
        ClientMessage::ResumeTimer(command(identity))
    }

    pub fn reset(identity: &TimerIdentity) -> Self {
        ClientMessage::ResetTimer(command(identity))
    }

    /// Creates an AddTime message from a donation.
    pub fn add_time(identity: &TimerIdentity, minutes: u32, donation: Donation) -> Self {
        ClientMessage::AddTime(AddTime {
            timer_key: identity.key.clone(),
            timer_name: identity.wire_name(),
            minutes,
            kind: donation.kind,
            metadata: donation.metadata,
        })
    }

    pub fn save_state(
        identity: &TimerIdentity,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        ClientMessage::SaveState(SaveState {
            timer_key: identity.key.clone(),
            name: name.into(),
            description,
        })
    }

    pub fn load_state(identity: &TimerIdentity, state_id: Option<String>) -> Self {
        ClientMessage::LoadState(LoadState {
            timer_key: identity.key.clone(),
            state_id,
        })
    }

    pub fn get_saved_states(identity: &TimerIdentity) -> Self {
        ClientMessage::GetSavedStates(TimerRef {
            timer_key: identity.key.clone(),
        })
    }

    pub fn get_timer_state(identity: &TimerIdentity) -> Self {
        ClientMessage::GetTimerState(command(identity))
    }

    /// Event name used on the persistent connection.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::CreateTimer(_) => "create_timer",
            ClientMessage::StartTimer(_) => "start_timer",
            ClientMessage::StopTimer(_) => "stop_timer",
            ClientMessage::PauseTimer(_) => "pause_timer",
            ClientMessage::ResumeTimer(_) => "resume_timer",
            ClientMessage::ResetTimer(_) => "reset_timer",
            ClientMessage::AddTime(_) => "add_time",
            ClientMessage::SaveState(_) => "save_state",
            ClientMessage::LoadState(_) => "load_state",
            ClientMessage::GetSavedStates(_) => "get_saved_states",
            ClientMessage::GetTimerState(_) => "get_timer_state",
        }
    }

    /// Path segment used for the equivalent one-shot request.
    pub fn route(&self) -> &'static str {
        match self {
            ClientMessage::CreateTimer(_) => "create",
            ClientMessage::StartTimer(_) => "start",
            ClientMessage::StopTimer(_) => "stop",
            ClientMessage::PauseTimer(_) => "pause",
            ClientMessage::ResumeTimer(_) => "resume",
            ClientMessage::ResetTimer(_) => "reset",
            ClientMessage::AddTime(_) => "add-time",
            ClientMessage::SaveState(_) => "save-state",
            ClientMessage::LoadState(_) => "load-state",
            ClientMessage::GetSavedStates(_) => "saved-states",
            ClientMessage::GetTimerState(_) => "get-state",
        }
    }

    /// The timer this command addresses.
    pub fn timer_key(&self) -> &str {
        match self {
            ClientMessage::CreateTimer(c) => &c.timer_key,
            ClientMessage::StartTimer(c)
            | ClientMessage::StopTimer(c)
            | ClientMessage::PauseTimer(c)
            | ClientMessage::ResumeTimer(c)
            | ClientMessage::ResetTimer(c)
            | ClientMessage::GetTimerState(c) => &c.timer_key,
            ClientMessage::AddTime(c) => &c.timer_key,
            ClientMessage::SaveState(c) => &c.timer_key,
            ClientMessage::LoadState(c) => &c.timer_key,
            ClientMessage::GetSavedStates(c) => &c.timer_key,
        }
    }

    /// The command arguments without the event tag, as sent in a request body.
    pub fn body(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        Ok(value
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Kinds of events pushed by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A full TimerSnapshot.
    #[serde(rename = "timer.state")]
    State,
    /// A partial tick carrying only `currentTime` (and optionally `lastUpdated`).
    #[serde(rename = "timer.update")]
    Update,
    /// A single SavedTimerState, sent after a save.
    #[serde(rename = "timer.state_saved")]
    StateSaved,
    /// A list of SavedTimerState.
    #[serde(rename = "timer.saved_states")]
    SavedStates,
    /// An error reported by the authority.
    #[serde(rename = "timer.error")]
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::State => "timer.state",
            EventKind::Update => "timer.update",
            EventKind::StateSaved => "timer.state_saved",
            EventKind::SavedStates => "timer.saved_states",
            EventKind::Error => "timer.error",
        }
    }
}

/// Messages pushed from authority to client.
///
/// `channel` names the timer key the event belongs to. Events without a
/// channel are broadcast to every client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Creates a broadcast envelope.
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Envelope {
            channel: None,
            kind,
            payload,
        }
    }

    /// Creates an envelope addressed to one timer.
    pub fn for_timer(channel: impl Into<String>, kind: EventKind, payload: Value) -> Self {
        Envelope {
            channel: Some(channel.into()),
            kind,
            payload,
        }
    }

    /// True if the envelope is a broadcast or addressed to `timer_key`.
    pub fn is_for(&self, timer_key: &str) -> bool {
        match self.channel.as_deref() {
            Some(channel) => channel == timer_key,
            None => true,
        }
    }

    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the envelope from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Payload of a `timer.error` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Strips a `{"data": {...}}` wrapper some authorities put around snapshots.
///
/// The payload is returned untouched when it already carries `currentTime`
/// or has no object under `data`.
pub fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map)
            if !map.contains_key("currentTime")
                && map.get("data").is_some_and(Value::is_object) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Strips a `{"data": [...]}` wrapper around a list payload.
pub fn unwrap_list(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_array) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
