//! Fallback wait signal using std::sync::Condvar
//!
//! Used on platforms without futex support.
//! Less efficient but portable.

use super::WaitSignal;
use keeper_core::Wakeup;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Condvar-based signal (fallback)
pub struct FallbackSignal {
    /// Latch, guarded for the condvar
    latch: Mutex<bool>,

    /// Condition variable
    condvar: Condvar,
}

impl FallbackSignal {
    /// Create a new, unset fallback signal
    pub fn new() -> Self {
        Self {
            latch: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn latch(&self) -> MutexGuard<'_, bool> {
        self.latch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FallbackSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitSignal for FallbackSignal {
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.latch();

        while !*guard {
            guard = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.condvar
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .condvar
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }

        // Consume the latch
        *guard = false;
        true
    }

    fn set(&self) {
        {
            let mut guard = self.latch();
            if *guard {
                return;
            }
            *guard = true;
        }
        self.condvar.notify_one();
    }
}

impl Wakeup for FallbackSignal {
    fn wake(&self) {
        self.set();
    }
}
