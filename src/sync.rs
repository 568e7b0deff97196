/*
 * Synchronization Primitives
 *
 * The rendezvous objects the process lifecycle needs: a counting semaphore
 * (exit notifications for a supervisor) and a one-shot broadcast event (the
 * waitpid/exit handshake).
 *
 * Waiters spin with a pause hint. Under the preemptive thread system that
 * embeds this crate the spinning thread is descheduled like any other, and
 * a parking implementation can replace these behind the same interface
 * without touching the callers.
 */

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counting semaphore
pub struct Semaphore {
    permits: AtomicUsize,
}

impl Semaphore {
    pub const fn new(permits: usize) -> Self {
        Self { permits: AtomicUsize::new(permits) }
    }

    /// Release one permit (V)
    pub fn signal(&self) {
        self.permits.fetch_add(1, Ordering::Release);
    }

    /// Take one permit without waiting; false if none available
    pub fn try_wait(&self) -> bool {
        self.permits
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |p| p.checked_sub(1))
            .is_ok()
    }

    /// Take one permit, waiting for a signal if necessary (P)
    pub fn wait(&self) {
        while !self.try_wait() {
            core::hint::spin_loop();
        }
    }

    pub fn permits(&self) -> usize {
        self.permits.load(Ordering::Relaxed)
    }
}

/// One-shot broadcast event
///
/// Starts unset; `broadcast` sets it forever and releases every current and
/// future waiter. Models a condition that, once true, stays true.
pub struct Event {
    set: AtomicBool,
}

impl Event {
    pub const fn new() -> Self {
        Self { set: AtomicBool::new(false) }
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Mark the event and wake every waiter
    pub fn broadcast(&self) {
        self.set.store(true, Ordering::Release);
    }

    /// Wait until the event has been broadcast
    pub fn wait(&self) {
        while !self.is_set() {
            core::hint::spin_loop();
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}
