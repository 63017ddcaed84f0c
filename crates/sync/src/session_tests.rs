// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the timer session.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::config::ReconnectConfig;
use crate::registry::subscriber;
use crate::test_helpers::{
    identity, recorder, snapshot_json, state_event, MockRemote, MockTransport, KEY,
};
use serde_json::json;
use tk_core::DonationType;
use yare::parameterized;

type TestSession = TimerSession<MockTransport, MockRemote>;

fn setup(config: SessionConfig) -> (TestSession, MockTransport, MockRemote) {
    let transport = MockTransport::new();
    let remote = MockRemote::new();
    let session =
        TimerSession::with_transports(identity(), config, transport.clone(), remote.clone());
    (session, transport, remote)
}

async fn connected(config: SessionConfig) -> (TestSession, MockTransport, MockRemote) {
    let (mut session, transport, remote) = setup(config);
    assert!(session.ensure_connection().await);
    (session, transport, remote)
}

fn with_max_attempts(max_attempts: u32) -> SessionConfig {
    SessionConfig {
        reconnect: ReconnectConfig {
            max_attempts,
            ..ReconnectConfig::default()
        },
        ..SessionConfig::default()
    }
}

fn codes(errors: &std::sync::Mutex<Vec<TimerError>>) -> Vec<ErrorCode> {
    errors.lock().unwrap().iter().map(|e| e.code).collect()
}

// Queueing and drain order

#[tokio::test(start_paused = true)]
async fn offline_commands_drain_in_order_then_resync() {
    let (mut session, transport, _) = setup(SessionConfig::default());
    session.pause(Via::Live).await.unwrap();
    session.resume(Via::Live).await.unwrap();
    session
        .add_time(5, Donation::bits("fan", 500), Via::Live)
        .await
        .unwrap();
    assert_eq!(session.pending_operations(), 3);
    assert!(transport.outgoing().is_empty());

    let (cb, connection) = recorder();
    session.subscribe_connection(cb);
    assert!(session.ensure_connection().await);

    assert_eq!(
        transport.sent_events(),
        vec!["pause_timer", "resume_timer", "add_time", "get_timer_state"]
    );
    assert_eq!(session.pending_operations(), 0);
    assert_eq!(*connection.lock().unwrap(), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn failed_send_keeps_order_across_reconnect() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, errors) = recorder();
    session.subscribe_errors(cb);

    transport.fail_next_sends(1);
    session.pause(Via::Live).await.unwrap();
    session.resume(Via::Live).await.unwrap();
    assert_eq!(session.pending_operations(), 2);
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(codes(&errors), vec![ErrorCode::ConnectionError]);

    // First retry is due after initial * 2^1
    let started = Instant::now();
    assert_eq!(session.step().await, Step::Continue);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(session.is_connected());

    assert_eq!(
        transport.sent_events(),
        vec!["get_timer_state", "pause_timer", "resume_timer", "get_timer_state"]
    );
}

// Reconciliation through the session

#[tokio::test(start_paused = true)]
async fn late_subscriber_receives_cached_snapshot() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (early, early_log) = recorder();
    session.subscribe_state(early);

    transport.push(state_event(snapshot_json(120, "RUNNING", "2026-01-01T00:00:00Z")));
    session.step().await;
    assert_eq!(early_log.lock().unwrap().len(), 1);

    let (late, late_log) = recorder::<TimerSnapshot>();
    session.subscribe_state(late);
    let late_log = late_log.lock().unwrap();
    assert_eq!(late_log.len(), 1);
    assert_eq!(late_log[0].current_time, 120);
    assert_eq!(early_log.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_snapshot_is_rejected_without_fan_out() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (states_cb, states) = recorder::<TimerSnapshot>();
    let (errors_cb, errors) = recorder();
    session.subscribe_state(states_cb);
    session.subscribe_errors(errors_cb);

    transport.push(state_event(snapshot_json(60, "RUNNING", "2026-01-01T00:00:00Z")));
    session.step().await;
    transport.push(state_event(snapshot_json(10, "UNKNOWN", "2026-01-01T00:01:00Z")));
    session.step().await;

    assert_eq!(states.lock().unwrap().len(), 1);
    assert_eq!(session.current_state().unwrap().current_time, 60);
    assert_eq!(codes(&errors), vec![ErrorCode::TimerStateError]);
}

#[tokio::test(start_paused = true)]
async fn stale_push_is_dropped_quietly() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (states_cb, states) = recorder::<TimerSnapshot>();
    let (errors_cb, errors) = recorder::<TimerError>();
    session.subscribe_state(states_cb);
    session.subscribe_errors(errors_cb);

    transport.push(state_event(snapshot_json(100, "RUNNING", "2026-01-01T00:00:10Z")));
    transport.push(state_event(snapshot_json(200, "PAUSED", "2026-01-01T00:00:05Z")));
    session.step().await;
    session.step().await;

    assert_eq!(states.lock().unwrap().len(), 1);
    assert_eq!(session.current_state().unwrap().current_time, 100);
    assert!(errors.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn events_for_other_timers_are_ignored() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, states) = recorder::<TimerSnapshot>();
    session.subscribe_state(cb);

    let payload = snapshot_json(5, "RUNNING", "2026-01-01T00:00:00Z");
    transport.push(Envelope::for_timer("other-timer", EventKind::State, payload.clone()));
    session.step().await;
    assert!(states.lock().unwrap().is_empty());

    transport.push(Envelope::new(EventKind::State, payload));
    session.step().await;
    assert_eq!(states.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_update_merges_onto_cached_snapshot() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, states) = recorder::<TimerSnapshot>();
    session.subscribe_state(cb);

    transport.push(state_event(snapshot_json(120, "RUNNING", "2026-01-01T00:00:00Z")));
    transport.push(Envelope::for_timer(KEY, EventKind::Update, json!({"currentTime": 119})));
    session.step().await;
    session.step().await;

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[1].current_time, 119);
    assert!(states[1].is_active());
}

#[tokio::test(start_paused = true)]
async fn countdown_at_zero_triggers_terminal_action() {
    for (action, expected) in [
        (TerminalAction::Pause, "pause_timer"),
        (TerminalAction::Stop, "stop_timer"),
    ] {
        let config = SessionConfig {
            terminal_action: action,
            ..SessionConfig::default()
        };
        let (mut session, transport, _) = connected(config).await;

        transport.push(state_event(snapshot_json(0, "RUNNING", "2026-01-01T00:00:00Z")));
        session.step().await;
        assert_eq!(transport.sent_events(), vec!["get_timer_state", expected]);
    }
}

#[tokio::test(start_paused = true)]
async fn fetched_countdown_at_zero_is_stopped_over_http() {
    let (mut session, transport, remote) = setup(SessionConfig::default());
    remote.set_state(Some(snapshot_json(0, "RUNNING", "2026-01-01T00:00:00Z")));

    let fetched = session.fetch_current_state_once().await.unwrap();
    assert_eq!(fetched.map(|s| s.current_time), Some(0));

    let commands = remote.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].event_name(), "pause_timer");
    assert_eq!(session.pending_operations(), 0);
    assert!(transport.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_shot_reply_at_zero_sends_terminal_action() {
    let config = SessionConfig {
        terminal_action: TerminalAction::Stop,
        ..SessionConfig::default()
    };
    let (mut session, _, remote) = setup(config);
    remote.set_command_response(Some(snapshot_json(0, "RUNNING", "2026-01-01T00:00:00Z")));

    session.resume(Via::OneShot).await.unwrap();

    let events: Vec<_> = remote
        .commands()
        .iter()
        .map(ClientMessage::event_name)
        .collect();
    // The stop's reply is the same expired snapshot and is not acted on
    assert_eq!(events, vec!["resume_timer", "stop_timer"]);
    assert_eq!(session.pending_operations(), 0);
}

#[tokio::test(start_paused = true)]
async fn paused_countdown_at_zero_sends_nothing() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    transport.push(state_event(snapshot_json(0, "PAUSED", "2026-01-01T00:00:00Z")));
    session.step().await;
    assert_eq!(transport.sent_events(), vec!["get_timer_state"]);
}

#[tokio::test(start_paused = true)]
async fn saved_state_push_merges_into_listing() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, listings) = recorder::<Vec<SavedTimerState>>();
    session.subscribe_saved_states(cb);

    let saved = |id: &str, name: &str| {
        json!({
            "stateId": id,
            "name": name,
            "type": "COUNTDOWN",
            "currentTime": 300,
            "status": "PAUSED",
            "lastUpdated": "2026-01-01T00:00:00Z",
        })
    };
    transport.push(Envelope::for_timer(
        KEY,
        EventKind::SavedStates,
        json!([saved("a", "Intro")]),
    ));
    transport.push(Envelope::for_timer(KEY, EventKind::StateSaved, saved("b", "Break")));
    session.step().await;
    session.step().await;

    let listings = listings.lock().unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].len(), 1);
    let ids: Vec<_> = listings[1].iter().filter_map(SavedTimerState::id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(session.saved_states().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_error_push_is_surfaced() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, errors) = recorder::<TimerError>();
    session.subscribe_errors(cb);

    transport.push(Envelope::for_timer(
        KEY,
        EventKind::Error,
        json!({"code": "TIMER_NOT_FOUND", "message": "no such timer"}),
    ));
    session.step().await;

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::RemoteError);
    assert_eq!(errors[0].remote_code.as_deref(), Some("TIMER_NOT_FOUND"));
    assert_eq!(errors[0].message, "no such timer");
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_keeps_connection() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, errors) = recorder();
    session.subscribe_errors(cb);

    transport.push_result(Err(TransportError::SerializationError("bad frame".into())));
    session.step().await;

    assert!(session.is_connected());
    assert_eq!(codes(&errors), vec![ErrorCode::TimerStateError]);
}

// Local preconditions

fn bits_without_count() -> Donation {
    let mut donation = Donation::bits("fan", 1);
    donation.metadata.bits = None;
    donation
}

fn raid_without_viewers() -> Donation {
    let mut donation = Donation::raid("raider", 1);
    donation.metadata.viewers = None;
    donation
}

#[parameterized(
    zero_minutes = { Intent::AddTime { minutes: 0, donation: Donation::subscription("fan") } },
    blank_username = { Intent::AddTime { minutes: 1, donation: Donation::subscription("  ") } },
    bits_missing_count = { Intent::AddTime { minutes: 1, donation: bits_without_count() } },
    raid_missing_viewers = { Intent::AddTime { minutes: 1, donation: raid_without_viewers() } },
    blank_save_name = { Intent::SaveState { name: " \t ".into(), description: Some("x".into()) } },
    blank_state_id = { Intent::LoadState { state_id: Some(String::new()) } },
)]
fn invalid_intents_fail_locally(intent: Intent) {
    assert!(matches!(intent.check(), Err(SessionError::InvalidInput(_))));
}

#[parameterized(
    pause = { Intent::Pause },
    load_latest = { Intent::LoadState { state_id: None } },
    sub = { Intent::AddTime { minutes: 3, donation: Donation::subscription("fan") } },
)]
fn valid_intents_pass(intent: Intent) {
    assert!(intent.check().is_ok());
    assert_eq!(intent.to_message(&identity()).timer_key(), KEY);
}

#[tokio::test(start_paused = true)]
async fn blank_save_name_never_leaves_the_client() {
    let (mut session, transport, remote) = setup(SessionConfig::default());

    for via in [Via::Live, Via::OneShot] {
        let err = session.save_state("   ", None, via).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
    }
    let handle = session.handle();
    let intent = Intent::SaveState {
        name: "\n".into(),
        description: None,
    };
    assert!(matches!(
        handle.send(intent, Via::Live),
        Err(SessionError::InvalidInput(_))
    ));

    assert_eq!(session.pending_operations(), 0);
    assert!(transport.outgoing().is_empty());
    assert!(remote.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn save_state_trims_name_and_drops_blank_description() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    session
        .save_state("  Intro  ", Some("   "), Via::Live)
        .await
        .unwrap();

    match transport.outgoing().last() {
        Some(ClientMessage::SaveState(save)) => {
            assert_eq!(save.name, "Intro");
            assert!(save.description.is_none());
        }
        other => panic!("expected save_state, got {:?}", other),
    }
}

// Connection lifecycle

#[tokio::test(start_paused = true)]
async fn connect_timeout_is_a_connection_error() {
    let (mut session, transport, _) = setup(SessionConfig::default());
    let (cb, errors) = recorder::<TimerError>();
    session.subscribe_errors(cb);
    transport.hang_connects(true);

    let started = Instant::now();
    assert!(!session.ensure_connection().await);
    assert!(started.elapsed() >= Duration::from_secs(10));

    let errors = errors.lock().unwrap();
    assert_eq!(errors[0].code, ErrorCode::ConnectionError);
    assert!(errors[0].message.contains("timed out"));
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_stops_watchdog_until_explicit_ensure() {
    let (mut session, transport, _) = setup(with_max_attempts(2));
    let (cb, errors) = recorder();
    session.subscribe_errors(cb);
    transport.fail_next_connects(100);

    assert!(!session.ensure_connection().await);
    for _ in 0..10 {
        if session.controller.is_exhausted() {
            break;
        }
        session.step().await;
    }
    // The first attempt plus two retries
    assert_eq!(transport.connect_calls(), 3);
    assert_eq!(
        codes(&errors),
        vec![
            ErrorCode::ConnectionError,
            ErrorCode::ConnectionError,
            ErrorCode::ConnectionError,
            ErrorCode::MaxReconnectAttempts
        ]
    );

    // Watchdog ticks, but the cycle is over
    session.step().await;
    session.step().await;
    assert_eq!(transport.connect_calls(), 3);
    assert_eq!(
        session.handle().status(),
        "disconnected (gave up after 3 attempts)"
    );

    transport.fail_next_connects(0);
    assert!(session.ensure_connection().await);
    assert_eq!(transport.connect_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn retries_follow_backoff_despite_watchdog() {
    let (mut session, transport, _) = setup(with_max_attempts(0));
    transport.fail_next_connects(6);

    let started = Instant::now();
    let mut attempts = vec![Duration::ZERO];
    assert!(!session.ensure_connection().await);
    for _ in 0..50 {
        if session.is_connected() {
            break;
        }
        let before = transport.connect_calls();
        session.step().await;
        if transport.connect_calls() > before {
            attempts.push(started.elapsed());
        }
    }

    assert!(session.is_connected());
    let gaps: Vec<u64> = attempts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_secs())
        .collect();
    assert_eq!(gaps, vec![2, 4, 8, 16, 30, 30]);
}

#[tokio::test(start_paused = true)]
async fn watchdog_connects_when_down() {
    let (mut session, transport, _) = setup(SessionConfig::default());

    let started = Instant::now();
    session.step().await;
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(session.is_connected());
    assert_eq!(transport.sent_events(), vec!["get_timer_state"]);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects_with_backoff() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, connection) = recorder();
    session.subscribe_connection(cb);

    transport.close_from_server();
    session.step().await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);

    session.step().await;
    assert!(session.is_connected());
    assert_eq!(*connection.lock().unwrap(), vec![false, true]);
    assert_eq!(transport.connect_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn ensure_connection_is_idempotent_when_connected() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    assert!(session.ensure_connection().await);
    assert_eq!(transport.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_clears_queue_and_cache() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let (cb, connection) = recorder();
    session.subscribe_connection(cb);

    transport.push(state_event(snapshot_json(30, "RUNNING", "2026-01-01T00:00:00Z")));
    session.step().await;
    assert!(session.current_state().is_some());

    session.disconnect().await;
    assert!(session.current_state().is_none());
    assert_eq!(*connection.lock().unwrap(), vec![false]);

    session.pause(Via::Live).await.unwrap();
    assert_eq!(session.pending_operations(), 1);
    session.disconnect().await;
    assert_eq!(session.pending_operations(), 0);

    // No automatic reconnect after an explicit teardown
    session.step().await;
    assert_eq!(transport.connect_calls(), 1);
}

// Handles and re-entrancy

#[tokio::test(start_paused = true)]
async fn handle_calls_from_subscribers_are_deferred() {
    let (mut session, transport, _) = connected(SessionConfig::default()).await;
    let handle = session.handle();
    session.subscribe_state(subscriber(move |snapshot: &TimerSnapshot| {
        if snapshot.current_time == 30 {
            handle.pause(Via::Live)?;
        }
        Ok(())
    }));

    transport.push(state_event(snapshot_json(30, "RUNNING", "2026-01-01T00:00:00Z")));
    session.step().await;
    assert_eq!(transport.sent_events(), vec!["get_timer_state"]);

    session.step().await;
    assert_eq!(transport.sent_events(), vec!["get_timer_state", "pause_timer"]);
}

#[tokio::test(start_paused = true)]
async fn handle_ensure_connection_runs_on_next_turn() {
    let (mut session, _, _) = setup(SessionConfig::default());
    let handle = session.handle();

    assert!(!handle.ensure_connection());
    session.step().await;
    assert!(handle.is_connected());
    assert!(handle.ensure_connection());
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn run_processes_handle_commands_until_shutdown() {
    let (mut session, transport, _) = setup(SessionConfig::default());
    let handle = session.handle();
    handle.pause(Via::Live).unwrap();
    handle.shutdown().unwrap();

    let task = tokio::spawn(async move {
        session.run().await;
        session
    });
    let session = task.await.unwrap();

    assert_eq!(transport.sent_events(), vec!["get_timer_state", "pause_timer"]);
    assert!(!session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn handle_reports_closed_session() {
    let (session, _, _) = setup(SessionConfig::default());
    let handle = session.handle();
    drop(session);
    assert!(matches!(handle.pause(Via::Live), Err(SessionError::Closed)));
    assert!(!handle.ensure_connection());
    assert!(matches!(handle.shutdown(), Err(SessionError::Closed)));
}

// One-shot path

#[tokio::test(start_paused = true)]
async fn one_shot_command_bypasses_queue_and_reconciles_response() {
    let (mut session, transport, remote) = setup(SessionConfig::default());
    let (cb, states) = recorder::<TimerSnapshot>();
    session.subscribe_state(cb);
    remote.set_command_response(Some(json!({
        "data": snapshot_json(50, "PAUSED", "2026-01-01T00:00:00Z")
    })));

    session.pause(Via::OneShot).await.unwrap();

    let commands = remote.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].event_name(), "pause_timer");
    assert!(transport.outgoing().is_empty());
    assert_eq!(session.pending_operations(), 0);
    assert_eq!(states.lock().unwrap()[0].current_time, 50);
}

#[tokio::test(start_paused = true)]
async fn one_shot_failure_is_reported_both_ways() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    let (cb, errors) = recorder();
    session.subscribe_errors(cb);
    remote.set_failing(true);

    let err = session.start(Via::OneShot).await.unwrap_err();
    assert!(matches!(err, SessionError::Request(_)));
    assert_eq!(codes(&errors), vec![ErrorCode::RequestError]);
}

#[tokio::test(start_paused = true)]
async fn check_exists_creates_missing_timer_with_defaults() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    remote.set_state(None);

    let existence = session.check_exists(Via::OneShot).await.unwrap();
    assert_eq!(existence, Existence::CreatedDefault);

    match remote.commands().first() {
        Some(ClientMessage::CreateTimer(create)) => {
            assert_eq!(create.timer_key, KEY);
            assert_eq!(create.timer_type, Some(TimerType::Countdown));
            assert_eq!(create.initial_time, Some(3600));
        }
        other => panic!("expected create_timer, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn check_exists_queues_live_create_while_offline() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    remote.set_state(None);

    let existence = session.check_exists(Via::Live).await.unwrap();
    assert_eq!(existence, Existence::CreatedDefault);
    assert_eq!(session.pending_operations(), 1);
    assert!(remote.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn check_exists_hydrates_found_timer() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    let (cb, states) = recorder::<TimerSnapshot>();
    session.subscribe_state(cb);
    remote.set_state(Some(snapshot_json(900, "PAUSED", "2026-01-01T00:00:00Z")));

    match session.check_exists(Via::OneShot).await.unwrap() {
        Existence::Found(snapshot) => assert_eq!(snapshot.current_time, 900),
        other => panic!("expected Found, got {:?}", other),
    }
    assert_eq!(states.lock().unwrap().len(), 1);
    assert!(remote.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_rejects_invalid_snapshot() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    let (cb, errors) = recorder();
    session.subscribe_errors(cb);
    remote.set_state(Some(json!({"timerKey": KEY, "currentTime": "later"})));

    let err = session.fetch_current_state_once().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState(_)));
    assert!(session.current_state().is_none());
    assert_eq!(codes(&errors), vec![ErrorCode::TimerStateError]);
}

#[tokio::test(start_paused = true)]
async fn one_shot_listing_is_fanned_out() {
    let (mut session, transport, remote) = setup(SessionConfig::default());
    let (cb, listings) = recorder::<Vec<SavedTimerState>>();
    session.subscribe_saved_states(cb);

    let state: SavedTimerState = serde_json::from_value(json!({
        "stateId": "s1",
        "name": "Intro",
        "type": "COUNTUP",
        "currentTime": 12,
        "status": "STOPPED",
        "lastUpdated": "2026-01-01T00:00:00Z",
    }))
    .unwrap();
    remote.set_saved(vec![state]);

    session.list_saved_states(Via::OneShot).await.unwrap();
    assert_eq!(listings.lock().unwrap()[0].len(), 1);
    assert_eq!(session.saved_states()[0].id(), Some("s1"));
    assert!(transport.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn donations_come_from_one_shot_lookup() {
    let (mut session, _, remote) = setup(SessionConfig::default());
    remote.set_donations(vec![DonationRecord {
        kind: DonationType::Raid,
        minutes_added: 10.0,
        username: "raider".into(),
        bits: None,
        viewers: Some(40),
    }]);

    let records = session.fetch_donations().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].viewers, Some(40));
}

#[test]
fn handle_is_send_and_clone() {
    fn assert_send_clone<T: Send + Sync + Clone>() {}
    assert_send_clone::<SessionHandle>();
}
