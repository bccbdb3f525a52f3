//! Linux futex-based wait signal
//!
//! Futex word semantics:
//! - 0 = not set
//! - 1 = set (latched, not yet consumed)
//!
//! Waiting:
//! 1. Swap the word to 0; if it was 1, the latch is consumed, done
//! 2. Increment waiting count
//! 3. FUTEX_WAIT on the word (blocks only while word == 0)
//! 4. Decrement waiting count, go to 1
//!
//! Setting:
//! 1. Store 1
//! 2. If anyone is waiting, FUTEX_WAKE one waiter
//!
//! Both sides use SeqCst on the word/count pair so a setter that sees
//! no waiter is guaranteed the waiter's FUTEX_WAIT sees word == 1.

use super::WaitSignal;
use keeper_core::Wakeup;
use nix::errno::Errno;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Linux futex-based signal
pub struct FutexSignal {
    /// Futex word: 0 = not set, 1 = set
    futex: AtomicU32,

    /// Threads currently inside FUTEX_WAIT (lets `set` skip the syscall)
    waiting: AtomicUsize,
}

impl FutexSignal {
    /// Create a new, unset futex signal
    pub fn new() -> Self {
        Self {
            futex: AtomicU32::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    fn futex_wait(&self, timeout: Option<Duration>) {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });

        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // FUTEX_WAIT: sleep if futex == 0
        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,           // Expected value (sleep if futex == 0)
                timespec_ptr,   // Relative timeout
                std::ptr::null::<u32>(), // uaddr2 (unused)
                0u32,           // val3 (unused)
            )
        };

        if result != 0 {
            // ETIMEDOUT / EAGAIN (word changed) / EINTR are all handled by
            // the caller re-checking the word and the deadline.
            match Errno::last() {
                Errno::ETIMEDOUT | Errno::EAGAIN | Errno::EINTR => {}
                other => keeper_core::kwarn!("futex wait failed: {:?}", other),
            }
        }
    }

    fn futex_wake(&self) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,           // Wake at most 1 waiter
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl Default for FutexSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitSignal for FutexSignal {
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if self.futex.swap(0, Ordering::SeqCst) == 1 {
                return true;
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.futex_wait(remaining);
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn set(&self) {
        if self.futex.swap(1, Ordering::SeqCst) == 1 {
            return; // Already latched, a wake is on its way or pending
        }

        if self.waiting.load(Ordering::SeqCst) == 0 {
            return; // No one to wake
        }

        self.futex_wake();
    }
}

impl Wakeup for FutexSignal {
    fn wake(&self) {
        self.set();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_transitions() {
        let signal = FutexSignal::new();
        assert_eq!(signal.futex.load(Ordering::SeqCst), 0);
        signal.set();
        assert_eq!(signal.futex.load(Ordering::SeqCst), 1);
        assert!(signal.wait(None));
        assert_eq!(signal.futex.load(Ordering::SeqCst), 0);
        assert_eq!(signal.waiting.load(Ordering::SeqCst), 0);
    }
}
