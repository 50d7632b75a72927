//! Bounded producer/consumer buffers and the semaphores that coordinate them.
//!
//! [`BoundedBuffer`] is a fixed-capacity ring shared by any number of
//! producer and consumer threads. Producers block while it is full, consumers
//! while it is empty. Its synchronization is pluggable: the permit counting
//! goes through a [`Semaphore`] backend and the ring itself sits behind any
//! [`lock_api::RawMutex`](parking_lot::lock_api::RawMutex).
//!
//! The [`scheduler`] module holds a handful of single-threaded scheduling
//! policies used to contrast admission orders.

pub mod bounded_buffer;
pub mod cancel;
pub mod error;
pub mod priority;
pub mod scheduler;
pub mod semaphore;
pub mod spin;

pub use bounded_buffer::{BoundedBuffer, PriorityBoundedBuffer, SpinBoundedBuffer};
pub use cancel::CancelToken;
pub use error::{Error, Rejected, Result};
pub use priority::{Priority, PrioritySemaphore};
pub use semaphore::{MonitorSemaphore, Semaphore, SemaphoreGuard};
pub use spin::{RawSpinLock, SpinLock, SpinSemaphore};
