// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tk-core: Shared library for the tock timer client
//!
//! This crate provides the timer data model, the wire protocol spoken with the
//! remote timer authority, and the payload validator used by the sync engine.

pub mod error;
pub mod format;
pub mod protocol;
pub mod timer;
pub mod validate;

pub use error::{Error, Result};
pub use format::format_hms;
pub use protocol::{ClientMessage, Envelope, EventKind, RemoteError};
pub use timer::{
    Donation, DonationMetadata, DonationRecord, DonationType, SavedTimerState, TimerIdentity,
    TimerSnapshot, TimerStatus, TimerType,
};
pub use validate::{validate, Rejection};
