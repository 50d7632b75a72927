//! Busy-waiting primitives: a semaphore and a test-and-set exclusion lock.
//!
//! Neither ever puts a thread to sleep. They back off with
//! [`crossbeam_utils::Backoff`] between attempts, which eventually yields the
//! time slice, but a waiter still burns CPU for as long as it waits. Use them
//! only for very short critical sections or to compare against the
//! monitor-based defaults.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;
use log::debug;
use parking_lot::lock_api::{GuardSend, RawMutex};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::semaphore::{deadline_after, Semaphore};

#[cfg(test)]
#[path = "spin_test.rs"]
mod spin_test;

/// Semaphore whose counter is a single atomic, decremented with compare-and-swap.
pub struct SpinSemaphore {
    permits: AtomicUsize,
}

impl SpinSemaphore {
    fn spin_until(&self, mut give_up: impl FnMut() -> Option<Error>) -> Result<()> {
        let backoff = Backoff::new();
        loop {
            if self.try_acquire() {
                return Ok(());
            }
            if let Some(error) = give_up() {
                return Err(error);
            }
            backoff.snooze();
        }
    }
}

impl Semaphore for SpinSemaphore {
    fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
        }
    }

    fn acquire(&self) {
        let backoff = Backoff::new();
        while !self.try_acquire() {
            backoff.snooze();
        }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.permits.load(Ordering::Relaxed);
        while current > 0 {
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    fn acquire_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = match deadline_after(timeout) {
            Some(deadline) => deadline,
            None => {
                self.acquire();
                return Ok(());
            }
        };
        self.spin_until(|| {
            (Instant::now() >= deadline).then(|| {
                debug!("spin semaphore acquire timed out after {:?}", timeout);
                Error::Timeout(timeout)
            })
        })
    }

    fn acquire_cancellable(&self, token: &CancelToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.spin_until(|| token.is_cancelled().then(|| Error::Cancelled))
    }

    fn release(&self) {
        self.permits.fetch_add(1, Ordering::Release);
    }

    fn available_permits(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }
}

/// Test-and-set mutual exclusion. Plugs into [`parking_lot::lock_api::Mutex`] as its raw lock.
pub struct RawSpinLock {
    locked: AtomicBool,
}

unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawSpinLock = RawSpinLock {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let backoff = Backoff::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // spin on a plain load so contending threads don't bounce the cache line
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

pub type SpinLock<T> = parking_lot::lock_api::Mutex<RawSpinLock, T>;
