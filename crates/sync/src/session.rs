// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Timer session: the facade UI code talks to.
//!
//! A [`TimerSession`] owns the transport, the reconnection controller, the
//! operation queue, the cached snapshot and the subscriber registry. It is
//! driven by one task calling [`TimerSession::step`] or
//! [`TimerSession::run`].
//!
//! Other tasks and subscriber callbacks use a [`SessionHandle`]. Requests
//! made through a handle are processed on the next loop turn, never inside
//! the dispatch that triggered them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use tk_core::protocol::unwrap_data;
use tk_core::{
    validate, ClientMessage, Donation, DonationRecord, Envelope, EventKind, RemoteError,
    SavedTimerState, TimerIdentity, TimerSnapshot, TimerType,
};

use crate::config::{SessionConfig, TerminalAction, Via};
use crate::error::{ErrorCode, SessionError, SessionResult, TimerError};
use crate::oneshot::{HttpRemote, OneShot};
use crate::queue::{Executor, OperationQueue};
use crate::reconcile::{Outcome, Reconciler};
use crate::reconnect::{
    ConnectionState, ReconnectController, RetryDecision, SharedConnectionState,
};
use crate::registry::{Registry, Subscriber, SubscriptionId};
use crate::transport::{Transport, TransportError, TransportResult, WebSocketTransport};

/// A user-level request to change or query the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create {
        timer_type: TimerType,
        initial_time: Option<i64>,
    },
    Start,
    Stop,
    Pause,
    Resume,
    Reset,
    AddTime {
        minutes: u32,
        donation: Donation,
    },
    SaveState {
        name: String,
        description: Option<String>,
    },
    /// `None` loads the most recent saved state.
    LoadState {
        state_id: Option<String>,
    },
    ListSavedStates,
    RequestState,
}

impl Intent {
    /// Checks local preconditions. Runs before anything is sent or queued.
    pub fn check(&self) -> SessionResult<()> {
        match self {
            Intent::AddTime { minutes, donation } => {
                if *minutes == 0 {
                    return Err(SessionError::InvalidInput(
                        "minutes to add must be greater than zero".to_string(),
                    ));
                }
                donation.validate()?;
                Ok(())
            }
            Intent::SaveState { name, .. } if name.trim().is_empty() => Err(
                SessionError::InvalidInput("save name cannot be empty".to_string()),
            ),
            Intent::LoadState { state_id: Some(id) } if id.trim().is_empty() => Err(
                SessionError::InvalidInput("state id cannot be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Builds the wire command for this intent.
    pub fn to_message(&self, identity: &TimerIdentity) -> ClientMessage {
        match self {
            Intent::Create {
                timer_type,
                initial_time,
            } => ClientMessage::create(identity, *timer_type, *initial_time),
            Intent::Start => ClientMessage::start(identity),
            Intent::Stop => ClientMessage::stop(identity),
            Intent::Pause => ClientMessage::pause(identity),
            Intent::Resume => ClientMessage::resume(identity),
            Intent::Reset => ClientMessage::reset(identity),
            Intent::AddTime { minutes, donation } => {
                ClientMessage::add_time(identity, *minutes, donation.clone())
            }
            Intent::SaveState { name, description } => {
                let description = description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                ClientMessage::save_state(identity, name.trim(), description)
            }
            Intent::LoadState { state_id } => {
                let state_id = state_id.as_deref().map(|id| id.trim().to_string());
                ClientMessage::load_state(identity, state_id)
            }
            Intent::ListSavedStates => ClientMessage::get_saved_states(identity),
            Intent::RequestState => ClientMessage::get_timer_state(identity),
        }
    }
}

/// Requests delivered to the session loop by a [`SessionHandle`].
#[derive(Debug)]
enum SessionCommand {
    Intent { intent: Intent, via: Via },
    EnsureConnection,
    Disconnect,
    Shutdown,
}

/// Result of [`TimerSession::check_exists`].
#[derive(Debug, Clone, PartialEq)]
pub enum Existence {
    /// The timer exists; this is its current snapshot.
    Found(TimerSnapshot),
    /// The timer did not exist and a create command was issued.
    CreatedDefault,
}

/// Whether the session loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Shutdown,
}

/// Cloneable, `Send` handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    shared: Arc<SharedConnectionState>,
}

impl SessionHandle {
    /// Queues an intent for the session loop. Local preconditions are
    /// checked here, synchronously.
    pub fn send(&self, intent: Intent, via: Via) -> SessionResult<()> {
        intent.check()?;
        self.command(SessionCommand::Intent { intent, via })
    }

    pub fn start(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::Start, via)
    }

    pub fn stop(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::Stop, via)
    }

    pub fn pause(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::Pause, via)
    }

    pub fn resume(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::Resume, via)
    }

    pub fn reset(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::Reset, via)
    }

    pub fn add_time(&self, minutes: u32, donation: Donation, via: Via) -> SessionResult<()> {
        self.send(Intent::AddTime { minutes, donation }, via)
    }

    pub fn request_state(&self, via: Via) -> SessionResult<()> {
        self.send(Intent::RequestState, via)
    }

    /// Returns true if connected. Otherwise asks the loop to connect and
    /// returns false.
    pub fn ensure_connection(&self) -> bool {
        if self.shared.is_connected() {
            return true;
        }
        if !self.shared.is_connecting() {
            if let Err(e) = self.command(SessionCommand::EnsureConnection) {
                tracing::debug!(error = %e, "connection request dropped");
            }
        }
        false
    }

    pub fn disconnect(&self) -> SessionResult<()> {
        self.command(SessionCommand::Disconnect)
    }

    /// Asks [`TimerSession::run`] to tear down and return.
    pub fn shutdown(&self) -> SessionResult<()> {
        self.command(SessionCommand::Shutdown)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn status(&self) -> String {
        self.shared.status_string()
    }

    fn command(&self, cmd: SessionCommand) -> SessionResult<()> {
        self.tx.send(cmd).map_err(|_| SessionError::Closed)
    }
}

/// Sends queued commands over the live transport.
struct LiveSender<'t, T>(&'t mut T);

impl<T: Transport> Executor<ClientMessage> for LiveSender<'_, T> {
    type Error = TransportError;

    fn execute<'a>(
        &'a mut self,
        op: &'a ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>> {
        tracing::debug!(event = op.event_name(), "sending command");
        self.0.send(op.clone())
    }
}

fn new_watchdog(period: Duration) -> Interval {
    let mut watchdog = tokio::time::interval_at(Instant::now() + period, period);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
    watchdog
}

async fn watchdog_tick(watchdog: &mut Option<Interval>) {
    match watchdog {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Client-side sync engine for one timer.
pub struct TimerSession<T: Transport = WebSocketTransport, R: OneShot = HttpRemote> {
    identity: TimerIdentity,
    config: SessionConfig,
    transport: T,
    remote: R,
    controller: ReconnectController,
    queue: OperationQueue<ClientMessage>,
    reconciler: Reconciler,
    registry: Registry,
    tx: mpsc::UnboundedSender<SessionCommand>,
    rx: mpsc::UnboundedReceiver<SessionCommand>,
    watchdog: Option<Interval>,
    /// Cleared by `disconnect`; the watchdog and retries stay quiet until
    /// `ensure_connection` is called again.
    auto_reconnect: bool,
}

impl TimerSession<WebSocketTransport, HttpRemote> {
    /// Creates a session using WebSocket and HTTP transports.
    pub fn new(
        identity: TimerIdentity,
        config: SessionConfig,
        http_url: &str,
    ) -> SessionResult<Self> {
        let remote = HttpRemote::new(http_url)?;
        Ok(Self::with_transports(
            identity,
            config,
            WebSocketTransport::new(),
            remote,
        ))
    }
}

impl<T: Transport, R: OneShot> TimerSession<T, R> {
    /// Creates a session with explicit transports.
    pub fn with_transports(
        identity: TimerIdentity,
        config: SessionConfig,
        transport: T,
        remote: R,
    ) -> Self {
        let controller =
            ReconnectController::new(config.reconnect.backoff(), config.reconnect.max_attempts);
        let (tx, rx) = mpsc::unbounded_channel();
        TimerSession {
            reconciler: Reconciler::new(identity.key.clone()),
            identity,
            config,
            transport,
            remote,
            controller,
            queue: OperationQueue::new(),
            registry: Registry::new(),
            tx,
            rx,
            watchdog: None,
            auto_reconnect: true,
        }
    }

    pub fn identity(&self) -> &TimerIdentity {
        &self.identity
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
            shared: self.controller.shared(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.controller.state() == ConnectionState::Connected && self.transport.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.controller.state()
    }

    /// The last accepted snapshot.
    pub fn current_state(&self) -> Option<&TimerSnapshot> {
        self.reconciler.current()
    }

    pub fn saved_states(&self) -> &[SavedTimerState] {
        self.reconciler.saved_states()
    }

    /// Commands waiting for the connection.
    pub fn pending_operations(&self) -> usize {
        self.queue.len()
    }

    // Subscriptions

    /// Subscribes to accepted snapshots. If one is cached, the new
    /// subscriber receives it before this returns.
    pub fn subscribe_state(&mut self, callback: Subscriber<TimerSnapshot>) -> SubscriptionId {
        self.registry
            .state
            .subscribe_with_current(callback, self.reconciler.current())
    }

    pub fn subscribe_connection(&mut self, callback: Subscriber<bool>) -> SubscriptionId {
        self.registry.connection.subscribe(callback)
    }

    pub fn subscribe_errors(&mut self, callback: Subscriber<TimerError>) -> SubscriptionId {
        self.registry.errors.subscribe(callback)
    }

    pub fn subscribe_saved_states(
        &mut self,
        callback: Subscriber<Vec<SavedTimerState>>,
    ) -> SubscriptionId {
        self.registry.saved_states.subscribe(callback)
    }

    pub fn unsubscribe_state(&mut self, id: SubscriptionId) -> bool {
        self.registry.state.unsubscribe(id)
    }

    pub fn unsubscribe_connection(&mut self, id: SubscriptionId) -> bool {
        self.registry.connection.unsubscribe(id)
    }

    pub fn unsubscribe_errors(&mut self, id: SubscriptionId) -> bool {
        self.registry.errors.unsubscribe(id)
    }

    pub fn unsubscribe_saved_states(&mut self, id: SubscriptionId) -> bool {
        self.registry.saved_states.unsubscribe(id)
    }

    // Intents

    /// Checks preconditions, then routes the intent over the chosen path.
    pub async fn perform(&mut self, intent: Intent, via: Via) -> SessionResult<()> {
        intent.check()?;
        match (via, &intent) {
            (Via::Live, _) => {
                self.emit(intent.to_message(&self.identity)).await;
                Ok(())
            }
            (Via::OneShot, Intent::ListSavedStates) => self.fetch_saved_states_once().await,
            (Via::OneShot, Intent::RequestState) => {
                self.fetch_current_state_once().await.map(|_| ())
            }
            (Via::OneShot, _) => self.send_once(intent.to_message(&self.identity)).await,
        }
    }

    /// Creates the timer with the configured defaults.
    pub async fn create(&mut self, via: Via) -> SessionResult<()> {
        let defaults = &self.config.defaults;
        let intent = Intent::Create {
            timer_type: defaults.timer_type,
            initial_time: Some(defaults.initial_time_secs),
        };
        self.perform(intent, via).await
    }

    pub async fn start(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::Start, via).await
    }

    pub async fn stop(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::Stop, via).await
    }

    pub async fn pause(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::Pause, via).await
    }

    pub async fn resume(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::Resume, via).await
    }

    pub async fn reset(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::Reset, via).await
    }

    pub async fn add_time(
        &mut self,
        minutes: u32,
        donation: Donation,
        via: Via,
    ) -> SessionResult<()> {
        self.perform(Intent::AddTime { minutes, donation }, via).await
    }

    /// Saves the current timer under `name`. Blank names are rejected
    /// locally; blank descriptions are dropped.
    pub async fn save_state(
        &mut self,
        name: &str,
        description: Option<&str>,
        via: Via,
    ) -> SessionResult<()> {
        let intent = Intent::SaveState {
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.perform(intent, via).await
    }

    pub async fn load_state(&mut self, state_id: Option<&str>, via: Via) -> SessionResult<()> {
        let intent = Intent::LoadState {
            state_id: state_id.map(str::to_string),
        };
        self.perform(intent, via).await
    }

    /// Requests the saved-state listing. It arrives on the saved-states
    /// channel.
    pub async fn list_saved_states(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::ListSavedStates, via).await
    }

    /// Asks the authority for a fresh snapshot.
    pub async fn request_state(&mut self, via: Via) -> SessionResult<()> {
        self.perform(Intent::RequestState, via).await
    }

    // One-shot lookups

    /// Looks the timer up. If it does not exist, creates it with the
    /// configured defaults over `via`.
    pub async fn check_exists(&mut self, via: Via) -> SessionResult<Existence> {
        match self.fetch_current_state_once().await? {
            Some(snapshot) => Ok(Existence::Found(snapshot)),
            None => {
                tracing::info!(key = %self.identity.key, "timer not found, creating");
                self.create(via).await?;
                Ok(Existence::CreatedDefault)
            }
        }
    }

    /// Fetches and reconciles the current snapshot. `None` if the timer
    /// does not exist.
    pub async fn fetch_current_state_once(&mut self) -> SessionResult<Option<TimerSnapshot>> {
        let fetched = self.remote.fetch_state(&self.identity).await;
        let payload = match fetched {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.request_failed(e.into())),
        };

        let outcome = self.reconciler.apply_state(payload);
        let result = match &outcome {
            Outcome::Accepted(snapshot) => Ok(Some(snapshot.clone())),
            Outcome::Stale => Ok(self.reconciler.current().cloned()),
            Outcome::Ignored => Err(SessionError::InvalidState(
                "snapshot belongs to another timer".to_string(),
            )),
            Outcome::Rejected(reason) => Err(SessionError::InvalidState(reason.clone())),
        };
        self.apply_outcome(outcome, Via::OneShot).await;
        result
    }

    /// Fetches the donation history.
    pub async fn fetch_donations(&mut self) -> SessionResult<Vec<DonationRecord>> {
        let fetched = self.remote.fetch_donations(&self.identity).await;
        fetched.map_err(|e| self.request_failed(e.into()))
    }

    async fn fetch_saved_states_once(&mut self) -> SessionResult<()> {
        let fetched = self.remote.fetch_saved_states(&self.identity).await;
        let states = fetched.map_err(|e| self.request_failed(e.into()))?;
        let listing = self.reconciler.set_saved(states).to_vec();
        self.registry.saved_states.dispatch(&listing);
        Ok(())
    }

    async fn send_once(&mut self, msg: ClientMessage) -> SessionResult<()> {
        if self.post_once(&msg).await? {
            self.finish_countdown(Via::OneShot).await;
        }
        Ok(())
    }

    /// Sends one command over HTTP and reconciles a snapshot in the reply.
    /// Returns true if that snapshot is a countdown that has run out.
    async fn post_once(&mut self, msg: &ClientMessage) -> SessionResult<bool> {
        let sent = self.remote.send_command(msg).await;
        match sent {
            Ok(Some(body)) if validate::check(&unwrap_data(body.clone())).is_ok() => {
                let outcome = self.reconciler.apply_state(body);
                Ok(self.publish_outcome(outcome))
            }
            Ok(_) => Ok(false),
            Err(e) => Err(self.request_failed(e.into())),
        }
    }

    fn request_failed(&self, err: SessionError) -> SessionError {
        tracing::warn!(error = %err, "one-shot request failed");
        self.registry
            .errors
            .dispatch(&TimerError::new(ErrorCode::RequestError, err.to_string()));
        err
    }

    // Connection lifecycle

    /// Returns true if connected, false if an attempt is already in flight.
    /// Otherwise runs one connection attempt, starting a fresh retry cycle
    /// if the previous one gave up.
    pub async fn ensure_connection(&mut self) -> bool {
        match self.controller.state() {
            ConnectionState::Connected => return true,
            ConnectionState::Connecting => return false,
            ConnectionState::Disconnected => {}
        }
        self.auto_reconnect = true;
        if self.controller.is_exhausted() {
            tracing::info!("starting a new reconnection cycle");
            self.controller.reset_cycle();
        }
        self.connect_once().await
    }

    /// Closes the connection and forgets queued commands and cached state.
    pub async fn disconnect(&mut self) {
        let was_connected = self.controller.state() == ConnectionState::Connected;
        self.auto_reconnect = false;
        self.controller.shutdown();
        if let Err(e) = self.transport.disconnect().await {
            tracing::debug!(error = %e, "error while closing connection");
        }
        self.queue.clear();
        self.reconciler.clear();
        if was_connected {
            tracing::info!("disconnected");
            self.registry.connection.dispatch(&false);
        }
    }

    async fn connect_once(&mut self) -> bool {
        if !self.controller.begin_attempt() {
            return false;
        }

        let timeout = self.config.reconnect.connect_timeout();
        tracing::debug!(
            url = %self.config.ws_url,
            attempt = self.controller.attempts() + 1,
            "connecting"
        );
        let result =
            match tokio::time::timeout(timeout, self.transport.connect(&self.config.ws_url)).await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::ConnectionFailed(format!(
                    "timed out after {}s",
                    timeout.as_secs()
                ))),
            };

        match result {
            Ok(()) => {
                self.on_connected().await;
                self.is_connected()
            }
            Err(e) => {
                self.on_connection_lost(e.to_string()).await;
                false
            }
        }
    }

    async fn on_connected(&mut self) {
        self.controller.on_connected();
        tracing::info!(url = %self.config.ws_url, "connected");
        self.registry.connection.dispatch(&true);

        // Queued commands first, then resync
        self.drain_queue().await;
        if self.is_connected() {
            self.emit(ClientMessage::get_timer_state(&self.identity)).await;
        }
    }

    async fn on_connection_lost(&mut self, reason: String) {
        if self.transport.is_connected() {
            let _ = self.transport.disconnect().await;
        }
        tracing::warn!(%reason, "connection lost");
        self.registry.connection.dispatch(&false);
        self.registry.errors.dispatch(&TimerError::connection(reason));

        match self.controller.on_failure() {
            RetryDecision::RetryAfter(delay) => {
                tracing::info!(
                    attempt = self.controller.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
            }
            RetryDecision::Exhausted { attempts } => {
                tracing::error!(attempts, "giving up on reconnecting");
                self.registry
                    .errors
                    .dispatch(&TimerError::max_attempts(attempts));
            }
        }
    }

    fn on_transport_error(&self, err: TransportError) -> Option<String> {
        if err.is_recoverable() {
            tracing::warn!(error = %err, "discarding malformed frame");
            self.registry.errors.dispatch(&TimerError::state(err.to_string()));
            None
        } else {
            Some(err.to_string())
        }
    }

    /// Enqueues a command and drains the queue if the connection is up.
    async fn emit(&mut self, msg: ClientMessage) {
        self.queue.enqueue(msg);
        self.drain_queue().await;
    }

    async fn drain_queue(&mut self) {
        while self.is_connected() && !self.queue.is_empty() {
            let outcome = self.queue.drain(&mut LiveSender(&mut self.transport)).await;
            let Some(err) = outcome.failure else {
                return;
            };
            if err.is_recoverable() {
                // An unencodable command would block everything behind it
                if let Some(op) = self.queue.discard_head() {
                    tracing::error!(event = op.event_name(), error = %err, "dropping command");
                    self.registry
                        .errors
                        .dispatch(&TimerError::new(ErrorCode::RequestError, err.to_string()));
                }
            } else {
                self.on_connection_lost(err.to_string()).await;
                return;
            }
        }
    }

    // Inbound events

    async fn handle_envelope(&mut self, envelope: Envelope) {
        if !envelope.is_for(&self.identity.key) {
            tracing::debug!(channel = ?envelope.channel, "ignoring event for another timer");
            return;
        }

        match envelope.kind {
            EventKind::State => {
                let outcome = self.reconciler.apply_state(envelope.payload);
                self.apply_outcome(outcome, Via::Live).await;
            }
            EventKind::Update => {
                let outcome = self.reconciler.apply_update(envelope.payload);
                self.apply_outcome(outcome, Via::Live).await;
            }
            EventKind::StateSaved => {
                let merged = self
                    .reconciler
                    .merge_saved(envelope.payload)
                    .map(<[SavedTimerState]>::to_vec);
                self.publish_saved(merged);
            }
            EventKind::SavedStates => {
                let replaced = self
                    .reconciler
                    .replace_saved(envelope.payload)
                    .map(<[SavedTimerState]>::to_vec);
                self.publish_saved(replaced);
            }
            EventKind::Error => {
                let payload = unwrap_data(envelope.payload);
                let err = match serde_json::from_value::<RemoteError>(payload.clone()) {
                    Ok(remote) => TimerError::from(remote),
                    Err(_) => TimerError::new(ErrorCode::RemoteError, describe(&payload)),
                };
                tracing::warn!(%err, "authority reported an error");
                self.registry.errors.dispatch(&err);
            }
        }
    }

    fn publish_saved(&self, listing: Result<Vec<SavedTimerState>, String>) {
        match listing {
            Ok(listing) => {
                self.registry.saved_states.dispatch(&listing);
            }
            Err(reason) => {
                tracing::warn!(%reason, "rejected saved states");
                self.registry.errors.dispatch(&TimerError::state(reason));
            }
        }
    }

    /// Publishes a reconciled snapshot, stopping an expired countdown over
    /// the path that delivered it.
    async fn apply_outcome(&mut self, outcome: Outcome, via: Via) {
        if self.publish_outcome(outcome) {
            self.finish_countdown(via).await;
        }
    }

    /// Returns true if an accepted countdown has run out.
    fn publish_outcome(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Accepted(snapshot) => {
                self.registry.state.dispatch(&snapshot);
                snapshot.countdown_expired()
            }
            Outcome::Stale | Outcome::Ignored => false,
            Outcome::Rejected(reason) => {
                tracing::warn!(%reason, "rejected timer state");
                self.registry.errors.dispatch(&TimerError::state(reason));
                false
            }
        }
    }

    async fn finish_countdown(&mut self, via: Via) {
        let msg = match self.config.terminal_action {
            TerminalAction::Pause => ClientMessage::pause(&self.identity),
            TerminalAction::Stop => ClientMessage::stop(&self.identity),
        };
        tracing::info!(event = msg.event_name(), ?via, "countdown reached zero");
        match via {
            Via::Live => self.emit(msg).await,
            Via::OneShot => {
                // Expiry in this reply is not acted on again
                if let Err(e) = self.post_once(&msg).await {
                    tracing::debug!(error = %e, "terminal command failed");
                }
            }
        }
    }

    async fn on_watchdog(&mut self) {
        // A scheduled retry owns the next attempt
        if !self.auto_reconnect
            || self.controller.state() != ConnectionState::Disconnected
            || self.controller.is_exhausted()
            || self.controller.retry_at().is_some()
        {
            return;
        }
        tracing::debug!("watchdog found the connection down");
        self.connect_once().await;
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Step {
        match cmd {
            SessionCommand::Intent { intent, via } => {
                if let Err(e) = self.perform(intent, via).await {
                    tracing::debug!(error = %e, "deferred intent failed");
                }
            }
            SessionCommand::EnsureConnection => {
                self.ensure_connection().await;
            }
            SessionCommand::Disconnect => self.disconnect().await,
            SessionCommand::Shutdown => return Step::Shutdown,
        }
        Step::Continue
    }

    async fn handle_received(&mut self, received: TransportResult<Option<Envelope>>) {
        let lost = match received {
            Ok(Some(envelope)) => {
                self.handle_envelope(envelope).await;
                None
            }
            Ok(None) => Some("connection closed by server".to_string()),
            Err(e) => self.on_transport_error(e),
        };
        if let Some(reason) = lost {
            self.on_connection_lost(reason).await;
        }
    }

    /// Runs one turn of the event loop.
    ///
    /// Waits for whichever comes first: a handle command, an inbound event
    /// (while connected), the scheduled retry, or the watchdog.
    pub async fn step(&mut self) -> Step {
        if self.watchdog.is_none() {
            self.watchdog = self.config.reconnect.watchdog_interval().map(new_watchdog);
        }

        let connected = self.is_connected();
        let retry_at = self.controller.retry_at().filter(|_| self.auto_reconnect);

        tokio::select! {
            cmd = self.rx.recv() => match cmd {
                Some(cmd) => return self.handle_command(cmd).await,
                None => return Step::Shutdown,
            },

            received = self.transport.recv(), if connected => {
                self.handle_received(received).await;
            }

            _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)),
                if retry_at.is_some() =>
            {
                self.connect_once().await;
            }

            _ = watchdog_tick(&mut self.watchdog) => {
                self.on_watchdog().await;
            }
        }

        Step::Continue
    }

    /// Connects, then runs the event loop until a handle asks for shutdown.
    /// Tears the connection down before returning.
    pub async fn run(&mut self) {
        self.ensure_connection().await;
        while self.step().await == Step::Continue {}
        self.disconnect().await;
    }
}

/// Message for an error payload that did not match the expected shape.
fn describe(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
