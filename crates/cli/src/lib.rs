// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tkrs - Command-line client for a remotely hosted stream timer.
//!
//! This crate provides the `tock` binary on top of [`tk_sync`]:
//!
//! - [`Config`] - TOML configuration with command-line overrides
//! - [`Cli`] - Argument parsing for every subcommand
//! - [`Error`] - Error types with user-facing hints
//!
//! ```rust,ignore
//! use clap::Parser;
//! use tkrs::Cli;
//!
//! let cli = Cli::parse();
//! tkrs::run(cli)?;
//! ```

mod cli;
mod commands;
mod display;

pub mod config;
pub mod error;

pub use cli::{Cli, Command, DonationKind, OutputFormat, Route, TimerKind};
pub use config::{default_config_path, Config, Overrides};
pub use error::{Error, Result};

/// Execute a CLI invocation: load the config, apply overrides and run the
/// command to completion.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::resolve(cli.config.as_deref())?;
    config.apply(cli.overrides());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::execute(config, cli.command))
}
