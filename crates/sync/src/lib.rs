// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tk-sync: Client-side sync engine for a remotely hosted timer.
//!
//! Keeps a local view of one timer consistent with the remote authority over
//! a live WebSocket connection, with one-shot HTTP requests as a fallback.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ TimerSession │────►│  Transport  │────►│   Remote    │
//! │   (facade)   │◄────│   (trait)   │◄────│  Authority  │
//! └──────────────┘     └─────────────┘     └─────────────┘
//!    │    │    │                                  ▲
//!    │    │    └──────────► OneShot (HTTP) ───────┘
//!    │    ▼
//!    │  ┌─────────────┐   ┌─────────────┐
//!    │  │    Queue    │   │  Reconciler │  (validate, staleness)
//!    │  │  (offline)  │   └─────────────┘
//!    │  └─────────────┘
//!    ▼
//! ┌─────────────┐
//! │  Registry   │  state / connection / errors / saved states
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - Commands issued while offline are queued and sent in order on connect
//! - Reconnect with exponential backoff and a bounded attempt budget
//! - Watchdog that reconnects a dropped session
//! - Every inbound snapshot is validated and checked for staleness
//! - Late subscribers are hydrated with the cached snapshot
//! - Injectable transports for testing

pub mod config;
pub mod error;
pub mod oneshot;
pub mod queue;
pub mod reconcile;
pub mod reconnect;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::{ReconnectConfig, SessionConfig, TerminalAction, TimerDefaults, Via};
pub use error::{ErrorCode, SessionError, SessionResult, TimerError};
pub use oneshot::{HttpRemote, OneShot, OneShotError};
pub use reconnect::{Backoff, ConnectionState};
pub use registry::{subscriber, Subscriber, SubscriberError, SubscriptionId};
pub use session::{Existence, Intent, SessionHandle, Step, TimerSession};
pub use transport::{Transport, TransportError, WebSocketTransport};

#[cfg(test)]
mod test_helpers;
