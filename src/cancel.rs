use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a cancellable wait sleeps before looking at its token again.
pub(crate) const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Cooperative cancellation flag shared between a waiter and whoever wants to stop it. Clones observe the same flag.
#[derive(Clone, Default, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
