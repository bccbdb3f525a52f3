//! Call request record
//!
//! One `CallRequest` per marshaled call. It carries the type-erased closure,
//! the `CallState` machine and a private completion signal that nobody else
//! ever waits on.
//!
//! The closure may borrow from the requester's stack. That is sound because
//! the requester never leaves `try_call` while the closure can still run or
//! still exists: it waits for `Done`, or it wins `Pending -> Abandoned` and
//! drops the closure itself before returning.

use crate::parking::{PlatformSignal, WaitSignal};
use keeper_core::{CallState, Wakeup};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Erased request closure; returns whether the call succeeded
pub(crate) type Job = Box<dyn FnOnce() -> bool + Send + 'static>;

/// Erased fire-and-forget closure
pub(crate) type PostJob = Box<dyn FnOnce() + Send + 'static>;

/// An entry in the gateway's queue
pub(crate) enum QueuedCall {
    /// Blocking call; the requester waits on the request's signal
    Request(Arc<CallRequest>),
    /// Fire-and-forget call; nobody waits
    Post(PostJob),
}

/// A single marshaled call
pub(crate) struct CallRequest {
    /// Sequence number, for tracing
    seq: u64,

    /// `CallState` as u8
    state: AtomicU8,

    /// Owned by whoever moves `state` out of `Pending`
    job: UnsafeCell<Option<Job>>,

    /// Private completion signal
    done: PlatformSignal,
}

// Safety: `job` is only touched by the single party that wins the CAS out
// of `Pending`; everything else is atomics.
unsafe impl Send for CallRequest {}
unsafe impl Sync for CallRequest {}

impl CallRequest {
    /// Wrap a closure that may borrow from the caller's stack
    ///
    /// # Safety
    ///
    /// Everything `job` borrows must stay alive until this request is
    /// `Done` or the caller has abandoned it with `try_abandon`.
    pub(crate) unsafe fn new<'a>(seq: u64, job: Box<dyn FnOnce() -> bool + Send + 'a>) -> Self {
        let job: Job = std::mem::transmute::<Box<dyn FnOnce() -> bool + Send + 'a>, Job>(job);
        Self {
            seq,
            state: AtomicU8::new(CallState::Pending as u8),
            job: UnsafeCell::new(Some(job)),
            done: PlatformSignal::new(),
        }
    }

    #[inline]
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub(crate) fn state(&self) -> CallState {
        CallState::from(self.state.load(Ordering::Acquire))
    }

    fn leave_pending(&self, to: CallState) -> bool {
        self.state
            .compare_exchange(
                CallState::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Owner side: run the closure, then mark `Done` and signal
    ///
    /// Returns `None` if the requester already abandoned the call, in which
    /// case only the signal is set. Otherwise `Some(succeeded)`.
    pub(crate) fn execute(&self) -> Option<bool> {
        if !self.leave_pending(CallState::Running) {
            self.done.set();
            return None;
        }

        // Safety: winning the CAS out of Pending grants exclusive access
        let job = unsafe { (*self.job.get()).take() };
        let succeeded = job.map(|job| job()).unwrap_or(false);

        self.state.store(CallState::Done as u8, Ordering::Release);
        self.done.set();
        Some(succeeded)
    }

    /// Requester side: give up on a call the owner has not started
    ///
    /// On success the closure is dropped here, on the requester's thread.
    pub(crate) fn try_abandon(&self) -> bool {
        if !self.leave_pending(CallState::Abandoned) {
            return false;
        }

        // Safety: winning the CAS out of Pending grants exclusive access
        let job = unsafe { (*self.job.get()).take() };
        drop(job);
        true
    }

    /// Requester side: block until completion or a wake from cancellation
    #[inline]
    pub(crate) fn wait(&self) {
        self.done.wait(None);
    }

    /// Set the completion signal without running anything (teardown)
    pub(crate) fn release(&self) {
        self.done.set();
    }
}

impl Wakeup for CallRequest {
    fn wake(&self) {
        self.done.set();
    }
}
