//! Fixed-capacity blocking queue.
//!
//! Two semaphores gate access to the ring: `free_slots` starts at the
//! capacity and is taken by producers, `filled_slots` starts at zero and is
//! taken by consumers. A slot is only touched after its permit has been
//! taken, so a producer can never overrun the ring and a consumer can never
//! read a slot whose write is not finished.
//!
//! The exclusion lock covers the slot copy and cursor advance only. It is
//! never held while waiting on a semaphore.
//!
//! All producers share one exclusion lock, so the ring's order is the order
//! in which they won it. Each producer's own items keep their submission
//! order, items of different producers interleave.

use std::time::Duration;

use log::{debug, error};
use parking_lot::lock_api::{Mutex, RawMutex};

use crate::cancel::CancelToken;
use crate::error::{Error, Rejected, Result};
use crate::priority::{Priority, PrioritySemaphore};
use crate::semaphore::{MonitorSemaphore, Semaphore};
use crate::spin::{RawSpinLock, SpinSemaphore};

#[cfg(test)]
#[path = "bounded_buffer_test.rs"]
mod bounded_buffer_test;

/// Busy-waiting everywhere: spin semaphores and a test-and-set ring lock.
pub type SpinBoundedBuffer<T> = BoundedBuffer<T, SpinSemaphore, RawSpinLock>;

/// Waiters are admitted by priority, see [`PrioritySemaphore`].
pub type PriorityBoundedBuffer<T> = BoundedBuffer<T, PrioritySemaphore>;

struct Ring<T> {
    slots: Box<[Option<T>]>,
    put_index: usize,
    get_index: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            put_index: 0,
            get_index: 0,
            len: 0,
        }
    }

    fn push(&mut self, item: T) {
        let slot = &mut self.slots[self.put_index];
        if slot.is_some() {
            error!("slot {} is still occupied, {} of {} slots in use", self.put_index, self.len, self.slots.len());
            panic!("Bounded buffer overflow: more items outstanding than slots");
        }
        *slot = Some(item);
        self.put_index = (self.put_index + 1) % self.slots.len();
        self.len += 1;
    }

    fn pop(&mut self) -> T {
        match self.slots[self.get_index].take() {
            Some(item) => {
                self.get_index = (self.get_index + 1) % self.slots.len();
                self.len -= 1;
                item
            }
            None => {
                error!("slot {} is empty although a filled slot was granted", self.get_index);
                panic!("Bounded buffer underflow: read from an empty slot");
            }
        }
    }
}

pub struct BoundedBuffer<T, S = MonitorSemaphore, R = parking_lot::RawMutex> {
    ring: Mutex<R, Ring<T>>,
    free_slots: S,
    filled_slots: S,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    /// Creates a buffer with `capacity` slots backed by monitor semaphores and a parking mutex.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_backends(capacity)
    }
}

impl<T, S: Semaphore, R: RawMutex> BoundedBuffer<T, S, R> {
    /// Creates a buffer with `capacity` slots using the semaphore and lock backends named by the type.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_backends(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("Capacity must be non-zero");
        }
        debug!("creating bounded buffer with {} slots", capacity);
        Self {
            ring: Mutex::new(Ring::new(capacity)),
            free_slots: S::new(capacity),
            filled_slots: S::new(0),
            capacity,
        }
    }

    /// Blocks until a slot is free, then stores `item`.
    pub fn put(&self, item: T) {
        self.free_slots.acquire();
        self.store(item);
    }

    /// Blocks until an item is available, then removes and returns it.
    pub fn get(&self) -> T {
        self.filled_slots.acquire();
        self.take()
    }

    pub fn try_put(&self, item: T) -> std::result::Result<(), Rejected<T>> {
        if !self.free_slots.try_acquire() {
            return Err(Rejected { item, reason: Error::WouldBlock });
        }
        self.store(item);
        Ok(())
    }

    pub fn try_get(&self) -> Result<T> {
        if !self.filled_slots.try_acquire() {
            return Err(Error::WouldBlock);
        }
        Ok(self.take())
    }

    pub fn put_timeout(&self, item: T, timeout: Duration) -> std::result::Result<(), Rejected<T>> {
        match self.free_slots.acquire_timeout(timeout) {
            Ok(()) => {
                self.store(item);
                Ok(())
            }
            Err(reason) => Err(Rejected { item, reason }),
        }
    }

    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.filled_slots.acquire_timeout(timeout)?;
        Ok(self.take())
    }

    pub fn put_cancellable(&self, item: T, token: &CancelToken) -> std::result::Result<(), Rejected<T>> {
        match self.free_slots.acquire_cancellable(token) {
            Ok(()) => {
                self.store(item);
                Ok(())
            }
            Err(reason) => Err(Rejected { item, reason }),
        }
    }

    pub fn get_cancellable(&self, token: &CancelToken) -> Result<T> {
        self.filled_slots.acquire_cancellable(token)?;
        Ok(self.take())
    }

    /// Capacity fixed at construction.
    pub fn num_slots(&self) -> usize {
        self.capacity
    }

    /// Items currently stored. Only a snapshot while other threads are active.
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, item: T) {
        self.ring.lock().push(item);
        self.filled_slots.release();
    }

    fn take(&self) -> T {
        let item = self.ring.lock().pop();
        self.free_slots.release();
        item
    }
}

impl<T, R: RawMutex> BoundedBuffer<T, PrioritySemaphore, R> {
    /// Like [`BoundedBuffer::put`], but producers blocked on a full buffer are let in highest `priority` first.
    pub fn put_with_priority(&self, item: T, priority: Priority) {
        self.free_slots.acquire_with_priority(priority);
        self.store(item);
    }

    /// Like [`BoundedBuffer::get`], but consumers blocked on an empty buffer are served highest `priority` first.
    pub fn get_with_priority(&self, priority: Priority) -> T {
        self.filled_slots.acquire_with_priority(priority);
        self.take()
    }

    pub fn waiting_producers(&self) -> usize {
        self.free_slots.waiting()
    }

    pub fn waiting_consumers(&self) -> usize {
        self.filled_slots.waiting()
    }
}
