//! Wait signals
//!
//! A binary, auto-reset signal: `set()` latches it, `wait()` blocks until it
//! is latched and consumes the latch. Used for the owner's wake signal
//! (reused across drains) and for each call request's single-use
//! completion signal.
//!
//! Platform-specific implementations use the most efficient primitive available.

use keeper_core::Wakeup;
use std::time::Duration;

/// Platform-specific wait signal
///
/// Every signal is also a `Wakeup`, so registering it with a
/// `CancellationToken` makes cancellation set it. A waiter therefore sees
/// one wake for either "my condition happened" or "cancelled" and re-checks
/// which one it was.
pub trait WaitSignal: Wakeup {
    /// Block until the signal is set or the timeout elapses
    ///
    /// Returns:
    /// - `true` if the signal was set (the latch is consumed)
    /// - `false` on timeout
    fn wait(&self, timeout: Option<Duration>) -> bool;

    /// Latch the signal and wake the waiter, if any
    ///
    /// Setting an already-set signal is a no-op. Never blocks.
    fn set(&self);
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexSignal as PlatformSignal;
    } else {
        mod fallback;
        pub use fallback::FallbackSignal as PlatformSignal;
    }
}

/// Create a new platform-appropriate signal, ready to share
pub fn new_signal() -> std::sync::Arc<PlatformSignal> {
    std::sync::Arc::new(PlatformSignal::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_timeout() {
        let signal = PlatformSignal::new();
        let start = Instant::now();
        let result = signal.wait(Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();

        assert!(!result);
        assert!(elapsed >= Duration::from_millis(40)); // Allow some slack
    }

    #[test]
    fn test_set_before_wait_is_latched() {
        let signal = PlatformSignal::new();
        signal.set();

        assert!(signal.wait(Some(Duration::from_millis(10))));
        // Latch consumed
        assert!(!signal.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_double_set_coalesces() {
        let signal = PlatformSignal::new();
        signal.set();
        signal.set();
        assert!(signal.wait(Some(Duration::from_millis(10))));
        assert!(!signal.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_set_wakes_waiter() {
        let signal = new_signal();
        let signal2 = Arc::clone(&signal);

        let handle = thread::spawn(move || signal2.wait(Some(Duration::from_secs(10))));

        // Give thread time to block
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        signal.set();

        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wakeup_sets_signal() {
        let signal = new_signal();
        let waker: Arc<dyn Wakeup> = signal.clone();
        waker.wake();
        assert!(signal.wait(None));
    }

    #[test]
    fn test_many_sets_one_waiter() {
        let signal = new_signal();
        thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| signal.set());
            }
        });
        assert!(signal.wait(Some(Duration::from_secs(1))));
    }
}
