use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use assertor::{assert_that, EqualityAssertion, ResultAssertion};
use ntest_timeout::timeout;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::semaphore::Semaphore;
use crate::spin::{SpinLock, SpinSemaphore};

#[test]
fn test_try_acquire_takes_only_available_permits() {
    let semaphore = SpinSemaphore::new(2);
    assert!(semaphore.try_acquire());
    assert!(semaphore.try_acquire());
    assert!(!semaphore.try_acquire());

    semaphore.release();
    assert_that!(semaphore.available_permits()).is_equal_to(1);
}

#[test]
#[timeout(1000)]
fn test_acquire_spins_until_released() {
    let semaphore = Arc::new(SpinSemaphore::new(0));
    let semaphore_clone = Arc::clone(&semaphore);

    let release_delay = Duration::from_millis(50);
    thread::spawn(move || {
        thread::sleep(release_delay);
        semaphore_clone.release();
    });

    let start = Instant::now();
    semaphore.acquire();
    assert!(start.elapsed() >= release_delay);
}

#[test]
#[timeout(1000)]
fn test_acquire_timeout_expires() {
    let semaphore = SpinSemaphore::new(0);
    let timeout = Duration::from_millis(30);
    assert_that!(semaphore.acquire_timeout(timeout)).has_err(Error::Timeout(timeout));
}

#[test]
#[timeout(1000)]
fn test_acquire_cancellable_stops_spinning() {
    let semaphore = Arc::new(SpinSemaphore::new(0));
    let token = CancelToken::new();

    let semaphore_clone = Arc::clone(&semaphore);
    let token_clone = token.clone();
    let waiter = thread::spawn(move || semaphore_clone.acquire_cancellable(&token_clone));

    thread::sleep(Duration::from_millis(20));
    token.cancel();
    assert_that!(waiter.join().unwrap()).has_err(Error::Cancelled);
}

#[test]
#[timeout(5000)]
fn test_spin_lock_serializes_increments() {
    const THREADS: usize = 4;
    const INCREMENTS: usize = 10_000;

    let counter = Arc::new(SpinLock::new(0usize));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    *counter.lock() += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_that!(*counter.lock()).is_equal_to(THREADS * INCREMENTS);
}

#[test]
fn test_spin_lock_try_lock_fails_while_held() {
    let lock = SpinLock::new(());
    let guard = lock.lock();
    assert!(lock.try_lock().is_none());
    drop(guard);
    assert!(lock.try_lock().is_some());
}
