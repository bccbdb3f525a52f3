//! Cancellation token for cooperative cancellation
//!
//! The background operation, every blocked requester and the pump loop
//! share one token. Blocking waits register their wait signal with the
//! token, so `cancel()` wakes all of them no matter what they wait on.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::error::{KeeperError, KeeperResult};
use crate::traits::Wakeup;

/// Token for checking and triggering cancellation
///
/// Cancellation is irreversible: once set the flag stays set and every
/// later `register` fires its waker immediately. When cancelled,
/// operations should return `Err(KeeperError::Cancelled)`.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    /// Cancellation flag
    cancelled: AtomicBool,

    /// Signals to wake on cancel, keyed by registration id
    waiters: Mutex<Vec<(u64, Arc<dyn Wakeup>)>>,

    /// Next registration id
    next_id: AtomicU64,
}

impl CancelInner {
    fn waiters(&self) -> MutexGuard<'_, Vec<(u64, Arc<dyn Wakeup>)>> {
        // A panicking waker cannot leave the list half-updated
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CancellationToken {
    /// Create a new independent cancellation token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Check if cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation and wake every registered waiter
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    /// Later calls are no-ops.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }

        let waiters = std::mem::take(&mut *self.inner.waiters());
        for (_, waker) in &waiters {
            waker.wake();
        }
        true
    }

    /// Check if cancelled and return error if so
    ///
    /// This is the typical usage pattern:
    /// ```ignore
    /// gateway.run_to_completion(|token| {
    ///     for chunk in chunks {
    ///         token.check()?;  // Returns Err(Cancelled) if cancelled
    ///         upload(chunk)?;
    ///     }
    ///     Ok(())
    /// })
    /// ```
    #[inline]
    pub fn check(&self) -> KeeperResult<()> {
        if self.is_cancelled() {
            Err(KeeperError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Register a waker to be woken on cancellation
    ///
    /// If the token is already cancelled the waker fires before this
    /// returns. The waker stays registered until the returned
    /// `Registration` is dropped.
    pub fn register(&self, waker: Arc<dyn Wakeup>) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut waiters = self.inner.waiters();
            // Checked under the lock: cancel() sets the flag before it
            // drains, so a waker pushed here is either drained or sees true.
            if !self.is_cancelled() {
                waiters.push((id, waker));
                return Registration {
                    token: Some(self.clone()),
                    id,
                };
            }
        }
        waker.wake();
        Registration { token: None, id }
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        self.inner.waiters().len()
    }

    fn deregister(&self, id: u64) {
        let mut waiters = self.inner.waiters();
        if let Some(pos) = waiters.iter().position(|(wid, _)| *wid == id) {
            waiters.swap_remove(pos);
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a waker registered with a token; deregisters on drop
#[must_use = "dropping a Registration deregisters the waker"]
pub struct Registration {
    token: Option<CancellationToken>,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.deregister(self.id);
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("active", &self.token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingWaker(AtomicUsize);

    impl Wakeup for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> Arc<CountingWaker> {
        Arc::new(CountingWaker(AtomicUsize::new(0)))
    }

    #[test]
    fn test_basic_cancellation() {
        let token = CancellationToken::new();

        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        assert!(token.cancel());

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(KeeperError::Cancelled)));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancellationToken::new();
        let waker = counter();
        let _reg = token.register(waker.clone());

        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_cancel_wakes_all_registered() {
        let token = CancellationToken::new();
        let a = counter();
        let b = counter();
        let _ra = token.register(a.clone());
        let _rb = token.register(b.clone());
        assert_eq!(token.waiter_count(), 2);

        token.cancel();
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
        assert_eq!(token.waiter_count(), 0);
    }

    #[test]
    fn test_register_after_cancel_fires_immediately() {
        let token = CancellationToken::new();
        token.cancel();

        let waker = counter();
        let _reg = token.register(waker.clone());
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
        assert_eq!(token.waiter_count(), 0);
    }

    #[test]
    fn test_dropped_registration_is_not_woken() {
        let token = CancellationToken::new();
        let waker = counter();
        let reg = token.register(waker.clone());
        drop(reg);
        assert_eq!(token.waiter_count(), 0);

        token.cancel();
        assert_eq!(waker.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_cancel_wakes_once() {
        let token = CancellationToken::new();
        let waker = counter();
        let _reg = token.register(waker.clone());

        let flipped = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    if token.cancel() {
                        flipped.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(flipped.load(Ordering::SeqCst), 1);
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }
}
