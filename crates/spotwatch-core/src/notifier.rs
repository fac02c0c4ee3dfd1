//! Latch-once broadcast signal.
//!
//! Uses `Mutex + Condvar` from std. The first `raise` stores its value and
//! wakes every waiter; later raises are ignored. Waiters arriving after the
//! raise return immediately.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One-shot signal carrying the value of the first raise.
pub struct Notifier<T = ()> {
    slot: Mutex<Option<T>>,
    cond: Condvar,
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    // A panic while holding the lock can't leave the slot half-written
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the signal. Returns `true` only for the call that latched it.
    pub fn raise(&self, value: T) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.cond.notify_all();
        true
    }

    pub fn is_raised(&self) -> bool {
        self.lock().is_some()
    }
}

impl<T: Clone> Notifier<T> {
    /// Current value without blocking
    pub fn peek(&self) -> Option<T> {
        self.lock().clone()
    }

    /// Block until raised.
    pub fn wait(&self) -> T {
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            slot = self
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until raised or `timeout` elapses. `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let slot = self.lock();
        let (slot, _) = self
            .cond
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}
