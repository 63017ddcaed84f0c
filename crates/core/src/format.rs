// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Display formatting for timer values.

/// Formats a number of seconds as `HH:MM:SS`.
///
/// The sign is dropped, so a count-up timer that went negative still renders
/// as a clock. Hours are not wrapped at 24.
pub fn format_hms(seconds: i64) -> String {
    let total = seconds.unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
