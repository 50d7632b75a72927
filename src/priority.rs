//! Priority-aware semaphore.
//!
//! Every waiter files a [`Ticket`] in a max-heap before sleeping and may only
//! take a permit while its ticket is at the top. Tickets compare by priority
//! first and by arrival order second, so among waiters of equal priority the
//! one that came first is admitted first. Releasing a permit wakes all
//! waiters; the one at the top proceeds, the others go back to sleep.
//!
//! Strict priority admission can starve low-priority waiters as long as
//! higher-priority ones keep arriving. That is inherent to the policy and is
//! not compensated for (no aging).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use log::debug;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::cancel::{CancelToken, CANCEL_POLL_INTERVAL};
use crate::error::{Error, Result};
use crate::semaphore::{deadline_after, Semaphore};

#[cfg(test)]
#[path = "priority_test.rs"]
mod priority_test;

pub type Priority = i32;

/// Priority used when a caller goes through the plain [`Semaphore`] interface.
pub const DEFAULT_PRIORITY: Priority = 0;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct Ticket {
    priority: Priority,
    seq: u64,
}

impl Ord for Ticket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Ticket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct State {
    permits: usize,
    waiters: BinaryHeap<Ticket>,
    next_seq: u64,
}

impl State {
    fn enqueue(&mut self, priority: Priority) -> Ticket {
        let ticket = Ticket { priority, seq: self.next_seq };
        self.next_seq += 1;
        self.waiters.push(ticket);
        ticket
    }

    fn admits(&self, ticket: Ticket) -> bool {
        self.permits > 0 && self.waiters.peek() == Some(&ticket)
    }
}

pub struct PrioritySemaphore {
    state: Mutex<State>,
    condvar: Condvar,
}

impl PrioritySemaphore {
    /// Blocks until a permit is available and no waiter ranks above `priority`, then takes the permit.
    pub fn acquire_with_priority(&self, priority: Priority) {
        let mut state = self.state.lock();
        let ticket = state.enqueue(priority);
        while !state.admits(ticket) {
            self.condvar.wait(&mut state);
        }
        self.admit(&mut state);
    }

    pub fn acquire_timeout_with_priority(&self, priority: Priority, timeout: Duration) -> Result<()> {
        let deadline = match deadline_after(timeout) {
            Some(deadline) => deadline,
            None => {
                self.acquire_with_priority(priority);
                return Ok(());
            }
        };
        let mut state = self.state.lock();
        let ticket = state.enqueue(priority);
        while !state.admits(ticket) {
            if self.condvar.wait_until(&mut state, deadline).timed_out() && !state.admits(ticket) {
                self.withdraw(&mut state, ticket);
                debug!("priority {} acquire timed out after {:?}", priority, timeout);
                return Err(Error::Timeout(timeout));
            }
        }
        self.admit(&mut state);
        Ok(())
    }

    pub fn acquire_cancellable_with_priority(&self, priority: Priority, token: &CancelToken) -> Result<()> {
        let mut state = self.state.lock();
        let ticket = state.enqueue(priority);
        loop {
            if token.is_cancelled() {
                self.withdraw(&mut state, ticket);
                debug!("priority {} acquire cancelled", priority);
                return Err(Error::Cancelled);
            }
            if state.admits(ticket) {
                self.admit(&mut state);
                return Ok(());
            }
            self.condvar.wait_for(&mut state, CANCEL_POLL_INTERVAL);
        }
    }

    /// Number of threads currently queued for a permit.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn admit(&self, state: &mut MutexGuard<'_, State>) {
        state.waiters.pop();
        state.permits -= 1;
        // the next ticket may have checked and gone back to sleep before we popped
        if state.permits > 0 && !state.waiters.is_empty() {
            self.condvar.notify_all();
        }
    }

    fn withdraw(&self, state: &mut MutexGuard<'_, State>, ticket: Ticket) {
        state.waiters.retain(|t| *t != ticket);
        if state.permits > 0 && !state.waiters.is_empty() {
            self.condvar.notify_all();
        }
    }
}

impl Semaphore for PrioritySemaphore {
    fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                waiters: BinaryHeap::new(),
                next_seq: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    fn acquire(&self) {
        self.acquire_with_priority(DEFAULT_PRIORITY)
    }

    /// Succeeds only if a permit is free and nobody is queued for it.
    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits == 0 || !state.waiters.is_empty() {
            return false;
        }
        state.permits -= 1;
        true
    }

    fn acquire_timeout(&self, timeout: Duration) -> Result<()> {
        self.acquire_timeout_with_priority(DEFAULT_PRIORITY, timeout)
    }

    fn acquire_cancellable(&self, token: &CancelToken) -> Result<()> {
        self.acquire_cancellable_with_priority(DEFAULT_PRIORITY, token)
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        self.condvar.notify_all();
    }

    fn available_permits(&self) -> usize {
        self.state.lock().permits
    }
}
