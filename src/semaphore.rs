//! Counting semaphores.
//!
//! A semaphore holds a number of permits. [`Semaphore::acquire`] blocks until
//! a permit is available and takes it, [`Semaphore::release`] hands one back
//! and wakes a waiter. Releasing more often than acquiring is allowed: the
//! extra permits are banked for later acquirers.
//!
//! The default backend is [`MonitorSemaphore`], a counter guarded by a mutex
//! with a condition variable for the sleepers. The predicate is always
//! re-checked under the same lock the waiter sleeps on, so a release racing
//! with a waiter that is about to sleep cannot be lost.

use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::cancel::{CancelToken, CANCEL_POLL_INTERVAL};
use crate::error::{Error, Result};

#[cfg(test)]
#[path = "semaphore_test.rs"]
mod semaphore_test;

pub trait Semaphore: Send + Sync {
    /// Creates a semaphore holding `permits` permits.
    fn new(permits: usize) -> Self
    where
        Self: Sized;

    /// Blocks the current thread until a permit is available, then takes it.
    fn acquire(&self);

    /// Takes a permit if one is available right now.
    fn try_acquire(&self) -> bool;

    /// Like [`Semaphore::acquire`], but gives up with [`Error::Timeout`] once `timeout` has elapsed.
    fn acquire_timeout(&self, timeout: Duration) -> Result<()>;

    /// Like [`Semaphore::acquire`], but gives up with [`Error::Cancelled`] once `token` is cancelled.
    fn acquire_cancellable(&self, token: &CancelToken) -> Result<()>;

    /// Returns one permit and wakes a waiter, if any. Never blocks.
    fn release(&self);

    fn available_permits(&self) -> usize;

    /// Acquires a permit that is released again when the returned guard is dropped.
    fn permit(&self) -> SemaphoreGuard<'_, Self>
    where
        Self: Sized,
    {
        self.acquire();
        SemaphoreGuard { semaphore: self }
    }
}

pub struct SemaphoreGuard<'a, S: Semaphore> {
    semaphore: &'a S,
}

impl<S: Semaphore> Drop for SemaphoreGuard<'_, S> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

pub struct MonitorSemaphore {
    counter: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore for MonitorSemaphore {
    fn new(permits: usize) -> Self {
        Self {
            counter: Mutex::new(permits),
            condvar: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut counter = self.counter.lock();
        while *counter == 0 {
            self.condvar.wait(&mut counter);
        }
        *counter -= 1;
    }

    fn try_acquire(&self) -> bool {
        let mut counter = self.counter.lock();
        if *counter == 0 {
            return false;
        }
        *counter -= 1;
        true
    }

    fn acquire_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = match deadline_after(timeout) {
            Some(deadline) => deadline,
            None => {
                self.acquire();
                return Ok(());
            }
        };
        let mut counter = self.counter.lock();
        while *counter == 0 {
            if self.condvar.wait_until(&mut counter, deadline).timed_out() && *counter == 0 {
                debug!("semaphore acquire timed out after {:?}", timeout);
                return Err(Error::Timeout(timeout));
            }
        }
        *counter -= 1;
        Ok(())
    }

    fn acquire_cancellable(&self, token: &CancelToken) -> Result<()> {
        let mut counter = self.counter.lock();
        loop {
            if token.is_cancelled() {
                // we may have swallowed a wake-up meant for someone else
                if *counter > 0 {
                    self.condvar.notify_one();
                }
                debug!("semaphore acquire cancelled");
                return Err(Error::Cancelled);
            }
            if *counter > 0 {
                *counter -= 1;
                return Ok(());
            }
            self.condvar.wait_for(&mut counter, CANCEL_POLL_INTERVAL);
        }
    }

    fn release(&self) {
        let mut counter = self.counter.lock();
        *counter += 1;
        self.condvar.notify_one();
    }

    fn available_permits(&self) -> usize {
        *self.counter.lock()
    }
}
