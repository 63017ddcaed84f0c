// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tk_core::{Donation, DonationType, TimerType};
use tk_sync::Via;

use crate::config::Overrides;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands that print timer data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Path a command takes to the timer service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Route {
    /// The persistent WebSocket connection
    Live,
    /// A single HTTP request
    #[value(alias = "http")]
    Oneshot,
}

impl From<Route> for Via {
    fn from(route: Route) -> Self {
        match route {
            Route::Live => Via::Live,
            Route::Oneshot => Via::OneShot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimerKind {
    Countdown,
    Countup,
}

impl From<TimerKind> for TimerType {
    fn from(kind: TimerKind) -> Self {
        match kind {
            TimerKind::Countdown => TimerType::Countdown,
            TimerKind::Countup => TimerType::Countup,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DonationKind {
    Sub,
    Bits,
    Raid,
}

#[derive(Parser)]
#[command(name = "tock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Watch and control a remotely hosted stream timer")]
pub struct Cli {
    /// Read configuration from <path> instead of the default location
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Timer key (overrides timer_key)
    #[arg(long, global = true, value_parser = non_empty_string)]
    pub key: Option<String>,

    /// Timer display name (overrides timer_name)
    #[arg(long = "name", global = true, value_name = "name")]
    pub timer_name: Option<String>,

    /// Base URL for one-shot requests (overrides http_url)
    #[arg(long, global = true, value_name = "url")]
    pub http: Option<String>,

    /// Send commands over this path (overrides prefer)
    #[arg(long, global = true, value_enum)]
    pub via: Option<Route>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            key: self.key.clone(),
            name: self.timer_name.clone(),
            http: self.http.clone(),
            via: self.via.map(Via::from),
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Follow the timer and print every change until Ctrl-C
    Watch,

    /// Print the current timer state
    State {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Create the timer
    Create {
        /// Timer direction (defaults to [defaults] timer_type)
        #[arg(long = "type", value_enum)]
        kind: Option<TimerKind>,

        /// Starting value in seconds (defaults to [defaults] initial_time_secs)
        #[arg(long, value_name = "secs")]
        time: Option<i64>,
    },

    /// Start the timer
    Start,

    /// Stop the timer
    Stop,

    /// Pause the timer
    Pause,

    /// Resume a paused timer
    Resume,

    /// Reset the timer to its initial value
    Reset,

    /// Add minutes on behalf of a donation
    #[command(name = "add-time")]
    AddTime {
        /// Minutes to add
        minutes: u32,

        /// Who donated
        #[arg(long, short)]
        user: String,

        /// Donation type
        #[arg(long, value_enum, default_value = "sub")]
        kind: DonationKind,

        /// Bit count (bits only)
        #[arg(long)]
        bits: Option<u32>,

        /// Raiding viewers (raid only)
        #[arg(long)]
        viewers: Option<u32>,

        /// Message attached to the donation
        #[arg(long, short)]
        message: Option<String>,
    },

    /// Save the current timer under a name
    Save {
        #[arg(value_parser = non_empty_string)]
        name: String,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// Load a saved state (the most recent one if no id is given)
    Load { state_id: Option<String> },

    /// List saved states
    States {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List donations that added time
    Donations {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

/// Builds the donation for `add-time`. Missing counts are left for the
/// session to reject.
pub fn donation(
    kind: DonationKind,
    user: &str,
    bits: Option<u32>,
    viewers: Option<u32>,
    message: Option<String>,
) -> Donation {
    let mut donation = Donation::subscription(user);
    donation.kind = match kind {
        DonationKind::Sub => DonationType::Subscription,
        DonationKind::Bits => DonationType::Bits,
        DonationKind::Raid => DonationType::Raid,
    };
    donation.metadata.bits = bits;
    donation.metadata.viewers = viewers;
    if let Some(message) = message {
        donation = donation.with_message(message);
    }
    donation
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
