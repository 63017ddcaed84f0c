// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for sync tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tk_core::{ClientMessage, DonationRecord, Envelope, EventKind, SavedTimerState, TimerIdentity};
use tokio::sync::Notify;

use crate::oneshot::{OneShot, OneShotError, OneShotResult};
use crate::registry::{subscriber, Subscriber};
use crate::transport::{Transport, TransportError, TransportResult};

pub const KEY: &str = "main-timer";

pub fn identity() -> TimerIdentity {
    TimerIdentity::new(KEY, "Main Timer").unwrap()
}

/// A full COUNTDOWN snapshot payload for the test timer.
pub fn snapshot_json(time: i64, status: &str, updated: &str) -> Value {
    json!({
        "timerKey": KEY,
        "timerName": "Main Timer",
        "currentTime": time,
        "status": status,
        "type": "COUNTDOWN",
        "lastUpdated": updated,
    })
}

pub fn state_event(payload: Value) -> Envelope {
    Envelope::for_timer(KEY, EventKind::State, payload)
}

/// Subscriber that records every value it receives.
pub fn recorder<T: Clone + Send + 'static>() -> (Subscriber<T>, Arc<Mutex<Vec<T>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let callback = subscriber(move |value: &T| {
        sink.lock().unwrap().push(value.clone());
        Ok(())
    });
    (callback, log)
}

#[derive(Default)]
struct MockState {
    connected: bool,
    connect_calls: u32,
    connect_failures: u32,
    hang_connect: bool,
    send_failures: u32,
    outgoing: Vec<ClientMessage>,
    incoming: VecDeque<TransportResult<Option<Envelope>>>,
}

/// Mock transport for testing without real sockets.
///
/// Clones share state, so a test keeps one clone to script and inspect the
/// transport the session owns.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    notify: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event that will be returned by recv().
    pub fn push(&self, envelope: Envelope) {
        self.push_result(Ok(Some(envelope)));
    }

    pub fn push_result(&self, result: TransportResult<Option<Envelope>>) {
        self.state.lock().unwrap().incoming.push_back(result);
        self.notify.notify_one();
    }

    /// The server closes the connection.
    pub fn close_from_server(&self) {
        self.push_result(Ok(None));
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().unwrap().connect_failures = count;
    }

    /// Connect attempts never complete.
    pub fn hang_connects(&self, hang: bool) {
        self.state.lock().unwrap().hang_connect = hang;
    }

    pub fn fail_next_sends(&self, count: u32) {
        self.state.lock().unwrap().send_failures = count;
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.lock().unwrap().connect_calls
    }

    /// Get all messages that were sent.
    pub fn outgoing(&self) -> Vec<ClientMessage> {
        self.state.lock().unwrap().outgoing.clone()
    }

    /// Event names of everything sent, in order.
    pub fn sent_events(&self) -> Vec<&'static str> {
        self.outgoing().iter().map(ClientMessage::event_name).collect()
    }
}

impl Transport for MockTransport {
    fn connect(
        &mut self,
        _url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let hang = {
                let mut s = state.lock().unwrap();
                s.connect_calls += 1;
                s.hang_connect
            };
            if hang {
                std::future::pending::<()>().await;
            }

            let mut s = state.lock().unwrap();
            if s.connect_failures > 0 {
                s.connect_failures -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            s.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            state.lock().unwrap().connected = false;
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut s = state.lock().unwrap();
            if !s.connected {
                return Err(TransportError::ConnectionClosed);
            }
            if s.send_failures > 0 {
                s.send_failures -= 1;
                s.connected = false;
                return Err(TransportError::SendFailed("mock send failure".into()));
            }
            s.outgoing.push(msg);
            Ok(())
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<Envelope>>> + Send + '_>> {
        let state = Arc::clone(&self.state);
        let notify = Arc::clone(&self.notify);
        Box::pin(async move {
            loop {
                {
                    let mut s = state.lock().unwrap();
                    if let Some(item) = s.incoming.pop_front() {
                        if matches!(item, Ok(None)) {
                            s.connected = false;
                        }
                        return item;
                    }
                }
                notify.notified().await;
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

#[derive(Default)]
struct RemoteState {
    state: Option<Value>,
    command_response: Option<Value>,
    failing: bool,
    commands: Vec<ClientMessage>,
    saved: Vec<SavedTimerState>,
    donations: Vec<DonationRecord>,
}

/// Scripted one-shot remote.
#[derive(Clone, Default)]
pub struct MockRemote {
    inner: Arc<Mutex<RemoteState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, payload: Option<Value>) {
        self.inner.lock().unwrap().state = payload;
    }

    pub fn set_command_response(&self, body: Option<Value>) {
        self.inner.lock().unwrap().command_response = body;
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    pub fn set_saved(&self, saved: Vec<SavedTimerState>) {
        self.inner.lock().unwrap().saved = saved;
    }

    pub fn set_donations(&self, donations: Vec<DonationRecord>) {
        self.inner.lock().unwrap().donations = donations;
    }

    pub fn commands(&self) -> Vec<ClientMessage> {
        self.inner.lock().unwrap().commands.clone()
    }

    fn check(&self) -> OneShotResult<()> {
        if self.inner.lock().unwrap().failing {
            return Err(OneShotError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

type Call<'a, T> = Pin<Box<dyn Future<Output = OneShotResult<T>> + Send + 'a>>;

impl OneShot for MockRemote {
    fn send_command<'a>(&'a self, msg: &'a ClientMessage) -> Call<'a, Option<Value>> {
        Box::pin(async move {
            self.check()?;
            let mut inner = self.inner.lock().unwrap();
            inner.commands.push(msg.clone());
            Ok(inner.command_response.clone())
        })
    }

    fn fetch_state<'a>(&'a self, _identity: &'a TimerIdentity) -> Call<'a, Option<Value>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.inner.lock().unwrap().state.clone())
        })
    }

    fn fetch_saved_states<'a>(
        &'a self,
        _identity: &'a TimerIdentity,
    ) -> Call<'a, Vec<SavedTimerState>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.inner.lock().unwrap().saved.clone())
        })
    }

    fn fetch_donations<'a>(
        &'a self,
        _identity: &'a TimerIdentity,
    ) -> Call<'a, Vec<DonationRecord>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.inner.lock().unwrap().donations.clone())
        })
    }
}
