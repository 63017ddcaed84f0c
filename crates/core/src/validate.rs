// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Structural checks for timer snapshots received from the authority.
//!
//! Rules run in order and stop at the first failure:
//! 1. the payload is a JSON object
//! 2. `currentTime` is a finite number
//! 3. `type` is a known timer type
//! 4. `status` is a known timer status

use serde_json::Value;
use thiserror::Error;

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("payload is not an object")]
    NotAnObject,

    #[error("currentTime is missing or not a finite number")]
    InvalidTime,

    #[error("unknown timer type: {0}")]
    UnknownType(String),

    #[error("unknown timer status: {0}")]
    UnknownStatus(String),
}

const TIMER_TYPES: [&str; 2] = ["COUNTDOWN", "COUNTUP"];
const TIMER_STATUSES: [&str; 3] = ["RUNNING", "PAUSED", "STOPPED"];

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn one_of(value: Option<&Value>, allowed: &[&str]) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| allowed.contains(&s))
}

/// Checks `candidate` and reports the first rule it breaks.
pub fn check(candidate: &Value) -> Result<(), Rejection> {
    let object = candidate.as_object().ok_or(Rejection::NotAnObject)?;

    let time = object.get("currentTime").and_then(Value::as_f64);
    if !time.is_some_and(f64::is_finite) {
        return Err(Rejection::InvalidTime);
    }

    let timer_type = object.get("type");
    if !one_of(timer_type, &TIMER_TYPES) {
        return Err(Rejection::UnknownType(describe(timer_type)));
    }

    let status = object.get("status");
    if !one_of(status, &TIMER_STATUSES) {
        return Err(Rejection::UnknownStatus(describe(status)));
    }

    Ok(())
}

/// Returns true if `candidate` is a well-formed timer snapshot.
pub fn validate(candidate: &Value) -> bool {
    match check(candidate) {
        Ok(()) => true,
        Err(rejection) => {
            tracing::debug!(%rejection, "rejected timer payload");
            false
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
