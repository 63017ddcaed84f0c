// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber registry for fanning session events out to observers.
//!
//! Each event category has its own ordered [`Channel`]. Dispatch calls every
//! subscriber in registration order. A subscriber that returns an error or
//! panics is logged and skipped; the rest still run.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tk_core::{SavedTimerState, TimerSnapshot};

use crate::error::TimerError;

/// Error a subscriber may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Shared callback handle. Keep a clone to unsubscribe by reference.
pub type Subscriber<T> = Arc<dyn Fn(&T) -> Result<(), SubscriberError> + Send + Sync>;

/// Wraps a closure as a [`Subscriber`].
pub fn subscriber<T, F>(f: F) -> Subscriber<T>
where
    F: Fn(&T) -> Result<(), SubscriberError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered subscribers for one event category.
pub struct Channel<T> {
    name: &'static str,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Channel {
            name,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// Appends a subscriber. Registering the same callback twice delivers
    /// every event to it twice.
    pub fn subscribe(&mut self, callback: Subscriber<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Appends a subscriber and immediately hands it `current`, if any.
    ///
    /// Only the new subscriber sees `current`.
    pub fn subscribe_with_current(
        &mut self,
        callback: Subscriber<T>,
        current: Option<&T>,
    ) -> SubscriptionId {
        if let Some(value) = current {
            self.deliver(&callback, value);
        }
        self.subscribe(callback)
    }

    /// Removes the subscription with this handle. Returns false if absent.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscribers.iter().position(|(sid, _)| *sid == id) {
            Some(index) => {
                self.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes the first subscription holding this exact callback.
    pub fn unsubscribe_callback(&mut self, callback: &Subscriber<T>) -> bool {
        match self
            .subscribers
            .iter()
            .position(|(_, cb)| Arc::ptr_eq(cb, callback))
        {
            Some(index) => {
                self.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Delivers `value` to every subscriber in registration order.
    ///
    /// Returns the number of subscribers that handled it without failing.
    pub fn dispatch(&self, value: &T) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, callback)| self.deliver(callback, value))
            .count()
    }

    fn deliver(&self, callback: &Subscriber<T>, value: &T) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(channel = self.name, error = %e, "subscriber failed");
                false
            }
            Err(_) => {
                tracing::warn!(channel = self.name, "subscriber panicked");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// The four event categories a session publishes.
#[derive(Debug)]
pub struct Registry {
    pub state: Channel<TimerSnapshot>,
    pub connection: Channel<bool>,
    pub errors: Channel<TimerError>,
    pub saved_states: Channel<Vec<SavedTimerState>>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            state: Channel::new("state"),
            connection: Channel::new("connection"),
            errors: Channel::new("error"),
            saved_states: Channel::new("saved_states"),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
