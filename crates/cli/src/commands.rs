// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations.
//!
//! Every command builds one session, performs its operation over the
//! configured path, prints the result and tears the session down. `watch`
//! keeps the session running until Ctrl-C.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tk_core::{SavedTimerState, TimerSnapshot, TimerType};
use tk_sync::{subscriber, Existence, Intent, TimerError, TimerSession, Via};
use tokio::time::Instant;

use crate::cli::{self, Command, OutputFormat};
use crate::config::Config;
use crate::display::{format_donation, format_saved_state, format_snapshot, format_snapshot_detail};
use crate::error::{Error, Result};

/// How long a live command waits for the authority to answer.
const REPLY_WINDOW: Duration = Duration::from_millis(1500);

/// Counts what the session has delivered so far.
#[derive(Default)]
struct Seen {
    snapshots: AtomicUsize,
    listings: AtomicUsize,
}

struct Runner {
    session: TimerSession,
    ws_url: String,
    via: Via,
    seen: Arc<Seen>,
}

/// Runs one command against the timer service.
pub async fn execute(config: Config, command: Command) -> Result<()> {
    let mut runner = Runner::new(&config)?;
    match command {
        Command::Watch => runner.watch().await,
        Command::State { output } => runner.state(output).await,
        Command::Create { kind, time } => {
            let defaults = &config.session.defaults;
            let intent = Intent::Create {
                timer_type: kind.map(TimerType::from).unwrap_or(defaults.timer_type),
                initial_time: Some(time.unwrap_or(defaults.initial_time_secs)),
            };
            runner.send(intent).await
        }
        Command::Start => runner.send(Intent::Start).await,
        Command::Stop => runner.send(Intent::Stop).await,
        Command::Pause => runner.send(Intent::Pause).await,
        Command::Resume => runner.send(Intent::Resume).await,
        Command::Reset => runner.send(Intent::Reset).await,
        Command::AddTime {
            minutes,
            user,
            kind,
            bits,
            viewers,
            message,
        } => {
            let donation = cli::donation(kind, &user, bits, viewers, message);
            runner.send(Intent::AddTime { minutes, donation }).await
        }
        Command::Save { name, description } => {
            runner.send(Intent::SaveState { name, description }).await
        }
        Command::Load { state_id } => runner.send(Intent::LoadState { state_id }).await,
        Command::States { output } => runner.states(output).await,
        Command::Donations { output } => runner.donations(output).await,
    }
}

impl Runner {
    fn new(config: &Config) -> Result<Self> {
        let identity = config.identity()?;
        let mut session = TimerSession::new(identity, config.session.clone(), &config.http_url)?;

        let seen = Arc::new(Seen::default());
        let counter = Arc::clone(&seen);
        session.subscribe_state(subscriber(move |_: &TimerSnapshot| {
            counter.snapshots.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let counter = Arc::clone(&seen);
        session.subscribe_saved_states(subscriber(move |_: &Vec<SavedTimerState>| {
            counter.listings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        session.subscribe_errors(subscriber(|err: &TimerError| {
            eprintln!("warning: {}", err);
            Ok(())
        }));

        Ok(Runner {
            session,
            ws_url: config.session.ws_url.clone(),
            via: config.prefer,
            seen,
        })
    }

    async fn connect(&mut self) -> Result<()> {
        if self.session.ensure_connection().await {
            Ok(())
        } else {
            Err(Error::Unreachable(self.ws_url.clone()))
        }
    }

    /// Steps the session until `done` holds or the reply window closes.
    async fn settle_until(&mut self, done: impl Fn(&Seen) -> bool) {
        let deadline = Instant::now() + REPLY_WINDOW;
        while !done(&self.seen) {
            if tokio::time::timeout_at(deadline, self.session.step())
                .await
                .is_err()
            {
                break;
            }
        }
    }

    async fn send(&mut self, intent: Intent) -> Result<()> {
        intent.check()?;
        let event = intent.to_message(self.session.identity()).event_name();

        if self.via == Via::Live {
            self.connect().await?;
        }
        self.session.perform(intent, self.via).await?;

        if self.via == Via::Live {
            if self.session.pending_operations() > 0 {
                return Err(Error::Unreachable(self.ws_url.clone()));
            }
            // The resync requested on connect, then the reply to the command
            self.settle_until(|seen| seen.snapshots.load(Ordering::SeqCst) >= 2)
                .await;
        }

        println!("Sent {}", event);
        if let Some(snapshot) = self.session.current_state() {
            println!("{}", format_snapshot(snapshot));
        }
        self.session.disconnect().await;
        Ok(())
    }

    async fn state(&mut self, output: OutputFormat) -> Result<()> {
        let snapshot = match self.via {
            Via::OneShot => self
                .session
                .fetch_current_state_once()
                .await?
                .ok_or_else(|| Error::TimerNotFound(self.session.identity().key.clone()))?,
            Via::Live => {
                self.connect().await?;
                self.settle_until(|seen| seen.snapshots.load(Ordering::SeqCst) > 0)
                    .await;
                let snapshot = self.session.current_state().cloned();
                self.session.disconnect().await;
                snapshot.ok_or(Error::NoResponse(REPLY_WINDOW.as_secs()))?
            }
        };

        match output {
            OutputFormat::Text => {
                for line in format_snapshot_detail(&snapshot) {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => print_json(&snapshot)?,
        }
        Ok(())
    }

    async fn states(&mut self, output: OutputFormat) -> Result<()> {
        if self.via == Via::Live {
            self.connect().await?;
        }
        self.session.list_saved_states(self.via).await?;
        if self.via == Via::Live {
            self.settle_until(|seen| seen.listings.load(Ordering::SeqCst) > 0)
                .await;
            if self.seen.listings.load(Ordering::SeqCst) == 0 {
                self.session.disconnect().await;
                return Err(Error::NoResponse(REPLY_WINDOW.as_secs()));
            }
        }

        let states = self.session.saved_states().to_vec();
        self.session.disconnect().await;
        match output {
            OutputFormat::Text if states.is_empty() => println!("No saved states"),
            OutputFormat::Text => {
                for state in &states {
                    println!("{}", format_saved_state(state));
                }
            }
            OutputFormat::Json => print_json(&states)?,
        }
        Ok(())
    }

    async fn donations(&mut self, output: OutputFormat) -> Result<()> {
        let records = self.session.fetch_donations().await?;
        match output {
            OutputFormat::Text if records.is_empty() => println!("No donations"),
            OutputFormat::Text => {
                for record in &records {
                    println!("{}", format_donation(record));
                }
            }
            OutputFormat::Json => print_json(&records)?,
        }
        Ok(())
    }

    async fn watch(&mut self) -> Result<()> {
        match self.session.check_exists(self.via).await {
            Ok(Existence::Found(_)) => {}
            Ok(Existence::CreatedDefault) => {
                println!("Timer not found, created it with the configured defaults")
            }
            Err(e) => tracing::warn!(error = %e, "initial lookup failed"),
        }

        // Hydrated with the fetched snapshot, if any
        self.session
            .subscribe_state(subscriber(|snapshot: &TimerSnapshot| {
                println!("{}", format_snapshot(snapshot));
                Ok(())
            }));
        self.session.subscribe_connection(subscriber(|connected: &bool| {
            eprintln!("{}", if *connected { "connected" } else { "disconnected" });
            Ok(())
        }));

        let handle = self.session.handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = handle.shutdown();
            }
        });

        self.session.run().await;
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
