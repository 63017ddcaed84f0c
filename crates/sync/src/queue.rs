// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending operation queue for commands issued while disconnected.
//!
//! Operations are drained strictly in issuance order. A failed operation goes
//! back to the head and stops the drain, so nothing issued after it can run
//! first. The queue lives for the lifetime of the session; nothing is persisted.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

/// Something that can execute a queued operation.
pub trait Executor<Op> {
    type Error;

    /// Executes one operation.
    fn execute<'a>(
        &'a mut self,
        op: &'a Op,
    ) -> Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>;
}

/// Result of a drain pass.
#[derive(Debug)]
pub struct DrainOutcome<E> {
    /// Operations executed successfully and removed.
    pub executed: usize,
    /// The error that stopped the drain, if any. The failing operation is
    /// back at the head of the queue.
    pub failure: Option<E>,
}

impl<E> DrainOutcome<E> {
    /// True if the drain stopped on a failure.
    pub fn stalled(&self) -> bool {
        self.failure.is_some()
    }
}

/// FIFO queue of pending operations.
#[derive(Debug)]
pub struct OperationQueue<Op> {
    pending: VecDeque<Op>,
}

impl<Op> Default for OperationQueue<Op> {
    fn default() -> Self {
        OperationQueue {
            pending: VecDeque::new(),
        }
    }
}

impl<Op> OperationQueue<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation to the tail.
    pub fn enqueue(&mut self, op: Op) {
        self.pending.push_back(op);
    }

    /// Executes queued operations from the head until the queue is empty or
    /// one fails.
    pub async fn drain<X>(&mut self, executor: &mut X) -> DrainOutcome<X::Error>
    where
        X: Executor<Op>,
    {
        let mut executed = 0;

        while let Some(op) = self.pending.pop_front() {
            match executor.execute(&op).await {
                Ok(()) => executed += 1,
                Err(e) => {
                    self.pending.push_front(op);
                    return DrainOutcome {
                        executed,
                        failure: Some(e),
                    };
                }
            }
        }

        DrainOutcome {
            executed,
            failure: None,
        }
    }

    /// Removes the head without executing it.
    pub fn discard_head(&mut self) -> Option<Op> {
        self.pending.pop_front()
    }

    /// Drops every pending operation.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
