// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Local, Utc};
use tk_core::{format_hms, DonationRecord, DonationType, SavedTimerState, TimerSnapshot};

fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One line per snapshot: `key  HH:MM:SS  STATUS  TYPE`.
pub fn format_snapshot(snapshot: &TimerSnapshot) -> String {
    let mut line = format!(
        "{}  {}  {}  {}",
        snapshot.timer_key,
        snapshot.display_time(),
        snapshot.status,
        snapshot.timer_type
    );
    if let Some(target) = snapshot.target_minutes {
        line.push_str(&format!("  (target {}m)", target));
    }
    line
}

/// Multi-line view used by `tock state`.
pub fn format_snapshot_detail(snapshot: &TimerSnapshot) -> Vec<String> {
    let mut lines = vec![format!("{}  {}", snapshot.display_time(), snapshot.status)];
    match &snapshot.timer_name {
        Some(name) => lines.push(format!("  timer:   {} ({})", snapshot.timer_key, name)),
        None => lines.push(format!("  timer:   {}", snapshot.timer_key)),
    }
    lines.push(format!("  type:    {}", snapshot.timer_type));
    lines.push(format!("  updated: {}", local_time(&snapshot.last_updated)));
    lines
}

pub fn format_saved_state(state: &SavedTimerState) -> String {
    let id = state.id().unwrap_or("-");
    let name = state.name.as_deref().unwrap_or("(unnamed)");
    let mut line = format!(
        "{}  {}  {}  {}  {}",
        id,
        name,
        format_hms(state.current_time),
        state.status,
        local_time(&state.last_updated)
    );
    if let Some(description) = state.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!("\n    {}", description));
    }
    line
}

pub fn format_donation(record: &DonationRecord) -> String {
    let detail = match record.kind {
        DonationType::Bits => record.bits.map(|b| format!(" ({} bits)", b)),
        DonationType::Raid => record.viewers.map(|v| format!(" ({} viewers)", v)),
        DonationType::Subscription => None,
    };
    format!(
        "{}  {}{}  +{}m",
        record.kind,
        record.username,
        detail.unwrap_or_default(),
        record.minutes_added
    )
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
