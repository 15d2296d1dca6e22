//! Shutdown flag
//!
//! The single coordination signal every long-running loop observes.
//! Setting it is one-shot; sleepers parked in [`ShutdownFlag::wait_timeout`]
//! wake as soon as it flips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-shot, process-wide shutdown signal
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    triggered: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Request shutdown
    ///
    /// Returns `true` only for the first caller.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Waiters re-check the flag under this lock, so a notify issued while
        // holding it cannot be lost.
        let _guard = self.lock.lock();
        self.cvar.notify_all();
        true
    }

    /// Sleep for up to `timeout`, waking early on shutdown
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        // A timeout past the end of `Instant` waits for shutdown alone
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lock.lock();

        while !self.is_triggered() {
            match deadline {
                Some(deadline) => {
                    if self.cvar.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cvar.wait(&mut guard),
            }
        }
        self.is_triggered()
    }
}
