//! Per-session cancellation
//!
//! Every shell session owns a [`CancelGate`]. The process-wide interrupt
//! handler signals the gate of whichever session is current; a blocked read
//! or a running command observes the signal and unwinds to its own prompt
//! loop without touching parent sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use thiserror::Error;

/// A blocking operation was interrupted by the cancel gate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupted")]
pub struct Interrupted;

/// Synchronization handle an external interrupt signals.
///
/// The flag half lets executors poll cheaply; the condvar half wakes
/// anything parked in [`CancelGate::sleep`].
#[derive(Debug, Default)]
pub struct CancelGate {
    requested: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl CancelGate {
    pub fn new() -> Self {
        CancelGate::default()
    }

    /// Request cancellation and wake any blocked waiter.
    pub fn signal(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.cond.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear the request; the dispatcher does this once it has mapped the
    /// interrupt to a `Cancelled` outcome.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Error out immediately if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        if self.is_signaled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Park for up to `dur`, waking early on a signal. Returns `Err` when
    /// the wait was interrupted.
    pub fn sleep(&self, dur: Duration) -> Result<(), Interrupted> {
        let deadline = std::time::Instant::now() + dur;
        let mut guard = match self.lock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if self.is_signaled() {
                return Err(Interrupted);
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let (g, _) = match self.cond.wait_timeout(guard, deadline - now) {
                Ok(r) => r,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard = g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn checkpoint_passes_until_signaled() {
        let gate = CancelGate::new();
        assert!(gate.checkpoint().is_ok());
        gate.signal();
        assert_eq!(gate.checkpoint(), Err(Interrupted));
        gate.clear();
        assert!(gate.checkpoint().is_ok());
    }

    #[test]
    fn sleep_wakes_on_signal() {
        let gate = Arc::new(CancelGate::new());
        let g = Arc::clone(&gate);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            g.signal();
        });

        let start = Instant::now();
        let result = gate.sleep(Duration::from_secs(10));
        assert_eq!(result, Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().ok();
    }

    #[test]
    fn sleep_times_out_without_signal() {
        let gate = CancelGate::new();
        assert!(gate.sleep(Duration::from_millis(10)).is_ok());
    }
}
