// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation of inbound timer payloads against the cached state.
//!
//! Every snapshot, pushed or fetched, goes through [`Reconciler::apply_state`]:
//!
//! 1. strip a `{"data": {...}}` wrapper
//! 2. validate the structure
//! 3. deserialize
//! 4. clamp negative countdown values to zero
//! 5. drop it if older than the cached snapshot
//! 6. cache it
//!
//! Server values are taken verbatim. Equal `lastUpdated` timestamps are
//! accepted so that an idempotent resync refreshes the cache.

use serde_json::Value;
use tk_core::protocol::{unwrap_data, unwrap_list};
use tk_core::{validate, SavedTimerState, TimerSnapshot, TimerType};

/// Result of applying one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The snapshot replaced the cached one.
    Accepted(TimerSnapshot),
    /// Older than the cached snapshot. Dropped without error.
    Stale,
    /// Addressed to another timer, or a partial update with nothing to
    /// merge onto. Dropped without error.
    Ignored,
    /// Malformed. The cache is unchanged.
    Rejected(String),
}

/// Holds the last accepted snapshot and the saved-state listing.
#[derive(Debug, Clone)]
pub struct Reconciler {
    timer_key: String,
    current: Option<TimerSnapshot>,
    saved_states: Vec<SavedTimerState>,
}

impl Reconciler {
    pub fn new(timer_key: impl Into<String>) -> Self {
        Reconciler {
            timer_key: timer_key.into(),
            current: None,
            saved_states: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&TimerSnapshot> {
        self.current.as_ref()
    }

    pub fn saved_states(&self) -> &[SavedTimerState] {
        &self.saved_states
    }

    /// Applies a full snapshot payload.
    pub fn apply_state(&mut self, payload: Value) -> Outcome {
        let payload = unwrap_data(payload);
        if let Err(rejection) = validate::check(&payload) {
            return Outcome::Rejected(rejection.to_string());
        }

        let mut snapshot: TimerSnapshot = match serde_json::from_value(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => return Outcome::Rejected(format!("invalid timer snapshot: {}", e)),
        };

        if snapshot.timer_key.trim().is_empty() {
            return Outcome::Rejected("timerKey is empty".to_string());
        }
        if snapshot.timer_key != self.timer_key {
            tracing::debug!(key = %snapshot.timer_key, "ignoring snapshot for another timer");
            return Outcome::Ignored;
        }

        if snapshot.timer_type == TimerType::Countdown && snapshot.current_time < 0 {
            snapshot.current_time = 0;
        }

        if let Some(cached) = &self.current {
            if snapshot.last_updated < cached.last_updated {
                tracing::debug!(
                    incoming = %snapshot.last_updated,
                    cached = %cached.last_updated,
                    "dropping stale snapshot"
                );
                return Outcome::Stale;
            }
        }

        self.current = Some(snapshot.clone());
        Outcome::Accepted(snapshot)
    }

    /// Applies a partial tick (`currentTime`, optionally `lastUpdated` and
    /// other snapshot fields) on top of the cached snapshot.
    pub fn apply_update(&mut self, payload: Value) -> Outcome {
        let Some(cached) = &self.current else {
            tracing::debug!("ignoring timer update before first snapshot");
            return Outcome::Ignored;
        };

        let Value::Object(update) = unwrap_data(payload) else {
            return Outcome::Rejected("timer update is not an object".to_string());
        };

        let mut merged = match serde_json::to_value(cached) {
            Ok(Value::Object(map)) => map,
            _ => return Outcome::Rejected("cached snapshot is not serializable".to_string()),
        };
        // A display string computed for the old value would be wrong now
        if !update.contains_key("formattedTime") {
            merged.remove("formattedTime");
        }
        merged.extend(update);

        self.apply_state(Value::Object(merged))
    }

    /// Replaces the saved-state listing.
    pub fn replace_saved(&mut self, payload: Value) -> Result<&[SavedTimerState], String> {
        let states: Vec<SavedTimerState> = serde_json::from_value(unwrap_list(payload))
            .map_err(|e| format!("invalid saved states: {}", e))?;
        Ok(self.set_saved(states))
    }

    pub fn set_saved(&mut self, states: Vec<SavedTimerState>) -> &[SavedTimerState] {
        self.saved_states = states;
        &self.saved_states
    }

    /// Merges one saved state into the listing, replacing an entry with the
    /// same id.
    pub fn merge_saved(&mut self, payload: Value) -> Result<&[SavedTimerState], String> {
        let state: SavedTimerState = serde_json::from_value(unwrap_data(payload))
            .map_err(|e| format!("invalid saved state: {}", e))?;

        let existing = state
            .id()
            .and_then(|id| self.saved_states.iter().position(|s| s.id() == Some(id)));
        match existing {
            Some(index) => self.saved_states[index] = state,
            None => self.saved_states.push(state),
        }
        Ok(&self.saved_states)
    }

    /// Forgets everything cached.
    pub fn clear(&mut self) {
        self.current = None;
        self.saved_states.clear();
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
