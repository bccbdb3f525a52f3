//! # Gateway - marshal calls onto the owner thread
//!
//! The gateway owns:
//! 1. The owner's identity, captured at construction
//! 2. A lock-free MPSC queue of pending calls (`SegQueue`, unbounded)
//! 3. The owner's wake signal, set on every enqueue and on completion
//! 4. The cancellation token shared by every waiter
//!
//! Requesting threads enqueue a `CallRequest`, set the wake signal and
//! block on the request's private completion signal. The token wakes that
//! same signal, so one wait covers both completion and cancellation.
//! The owner thread drains the queue from the pump loop (see `pump`).

use crate::config::GatewayConfig;
use crate::parking::{new_signal, PlatformSignal, WaitSignal};
use crate::request::{CallRequest, QueuedCall};

use keeper_core::{
    kdebug, kerror, ktrace, kwarn, BoxError, CallState, CancellationToken, KeeperError,
    KeeperResult, OwnerId, PumpState, Registration,
};

use crossbeam_queue::SegQueue;

use std::any::Any;
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

/// Counters exposed through `Gateway::stats`
#[derive(Default)]
pub(crate) struct StatCounters {
    pub(crate) inline: AtomicU64,
    pub(crate) queued: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) abandoned: AtomicU64,
    pub(crate) posts: AtomicU64,
    pub(crate) drains: AtomicU64,
}

/// Snapshot of gateway activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Calls made on the owner thread and executed directly
    pub calls_inline: u64,
    /// Calls queued from other threads
    pub calls_queued: u64,
    /// Queued calls the owner executed
    pub calls_completed: u64,
    /// Executed calls that returned an error or panicked
    pub calls_failed: u64,
    /// Queued calls given up by their requester after cancellation
    pub calls_abandoned: u64,
    /// Fire-and-forget calls executed
    pub posts_run: u64,
    /// Drain passes performed by the pump
    pub drains: u64,
}

/// Thread-affinity gateway
///
/// Built on the thread that will own it. Share it by reference with the
/// background operation (`run_to_completion` lends it to a scoped thread)
/// or wrap it in an `Arc`.
pub struct Gateway {
    pub(crate) owner: OwnerId,
    pub(crate) queue: SegQueue<QueuedCall>,
    pub(crate) wake: Arc<PlatformSignal>,
    pub(crate) token: CancellationToken,
    pub(crate) state: AtomicU8,
    pub(crate) operation_done: AtomicBool,
    pub(crate) config: GatewayConfig,
    pub(crate) stats: StatCounters,
    next_seq: AtomicU64,
    // Keeps the wake signal registered so cancel() wakes the pump
    _wake_registration: Registration,
}

impl Gateway {
    /// Create a gateway owned by the calling thread
    ///
    /// Configuration comes from the environment; an invalid environment
    /// falls back to the library defaults.
    pub fn new() -> Self {
        let config = GatewayConfig::from_env();
        match config.validate() {
            Ok(()) => Self::build(config),
            Err(msg) => {
                kwarn!("ignoring KEEPER_* environment: {}", msg);
                Self::build(GatewayConfig::builtin())
            }
        }
    }

    /// Create a gateway owned by the calling thread with explicit config
    pub fn with_config(config: GatewayConfig) -> KeeperResult<Self> {
        config.validate().map_err(KeeperError::InvalidConfig)?;
        Ok(Self::build(config))
    }

    fn build(config: GatewayConfig) -> Self {
        let owner = OwnerId::current();
        let token = CancellationToken::new();
        let wake = new_signal();
        let wake_registration = token.register(wake.clone());

        if config.debug_logging {
            kdebug!("gateway created, owner={}", owner);
        }

        Self {
            owner,
            queue: SegQueue::new(),
            wake,
            token,
            state: AtomicU8::new(PumpState::Idle as u8),
            operation_done: AtomicBool::new(false),
            config,
            stats: StatCounters::default(),
            next_seq: AtomicU64::new(1),
            _wake_registration: wake_registration,
        }
    }

    /// Run `invoke` on the owner thread and return its value
    ///
    /// From the owner thread this runs `invoke` directly. From any other
    /// thread it blocks until the owner has run it, or returns
    /// `Err(Cancelled)` if the gateway is cancelled first. A panic inside
    /// `invoke` is re-raised on the calling thread.
    pub fn call<F, R>(&self, invoke: F) -> KeeperResult<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.try_call(|| Ok::<R, Infallible>(invoke()))
    }

    /// Like `call`, for fallible work
    ///
    /// An `Err` from `invoke` comes back as `KeeperError::Propagated`
    /// holding the original error.
    pub fn try_call<F, R, E>(&self, invoke: F) -> KeeperResult<R>
    where
        F: FnOnce() -> Result<R, E> + Send,
        R: Send,
        E: Into<BoxError>,
    {
        if self.owner.is_current() {
            // Direct branch: no queue, no signal round-trip. This is what
            // keeps reentrant calls from deadlocking the owner.
            self.stats.inline.fetch_add(1, Ordering::Relaxed);
            return invoke().map_err(|e| KeeperError::Propagated(e.into()));
        }

        self.token.check()?;

        let mut outcome: Option<thread::Result<Result<R, BoxError>>> = None;
        let slot = &mut outcome;
        let job: Box<dyn FnOnce() -> bool + Send + '_> = Box::new(move || {
            let result: thread::Result<Result<R, BoxError>> =
                panic::catch_unwind(AssertUnwindSafe(|| invoke().map_err(Into::into)));
            let succeeded = matches!(result, Ok(Ok(_)));
            *slot = Some(result);
            succeeded
        });

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        // Safety: this function does not return until the request is Done
        // or abandoned by us, so `outcome` and `invoke` outlive the job.
        let request = Arc::new(unsafe { CallRequest::new(seq, job) });
        let registration = self.token.register(request.clone());

        self.queue.push(QueuedCall::Request(Arc::clone(&request)));
        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        self.wake.set();

        #[cfg(feature = "debug-logging")]
        ktrace!("call #{} queued", seq);

        loop {
            match request.state() {
                CallState::Done => break,
                CallState::Pending if self.token.is_cancelled() => {
                    if request.try_abandon() {
                        drop(registration);
                        self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
                        ktrace!("call #{} abandoned after cancel", seq);
                        return Err(KeeperError::Cancelled);
                    }
                    // Lost the race: the owner is running it, wait it out
                }
                _ => {}
            }
            request.wait();
        }
        drop(registration);

        match outcome.take() {
            Some(Ok(result)) => result.map_err(KeeperError::Propagated),
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => unreachable!("call #{} settled without an outcome", request.seq()),
        }
    }

    /// Run `invoke` on the owner thread without waiting for it
    ///
    /// From the owner thread this runs `invoke` directly. Otherwise it is
    /// queued behind earlier calls and runs on the next drain. A panic
    /// inside a posted call is logged and does not reach anyone.
    ///
    /// Off the owner thread this fails with `Err(Cancelled)` once the
    /// gateway is cancelled or closed. A post racing with the close of a
    /// finished run may be accepted and then discarded unrun on drop.
    pub fn post<F>(&self, invoke: F) -> KeeperResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.owner.is_current() {
            self.stats.inline.fetch_add(1, Ordering::Relaxed);
            invoke();
            return Ok(());
        }

        self.token.check()?;
        self.queue.push(QueuedCall::Post(Box::new(invoke)));
        self.wake.set();
        Ok(())
    }

    /// Cancel: wakes every blocked requester and the pump
    ///
    /// Irreversible and idempotent. A call already running on the owner
    /// thread is not interrupted.
    pub fn cancel(&self) {
        if self.token.cancel() {
            kdebug!("gateway cancelled, {} calls pending", self.queue.len());
        }
    }

    /// Stop accepting calls once no pump will drain the queue again
    ///
    /// Goes through the token, so a requester that enqueued after the final
    /// drain is woken and abandons its still-pending request.
    pub(crate) fn close(&self) {
        if self.token.cancel() {
            kdebug!("gateway closed, {} calls left unserviced", self.queue.len());
        }
    }

    /// Check if `cancel` has been called
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The shared cancellation token
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Identity of the owner thread
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Check if the calling thread is the owner
    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        self.owner.is_current()
    }

    /// Calls waiting in the queue (hint, may be stale)
    #[inline]
    pub fn pending_calls(&self) -> usize {
        self.queue.len()
    }

    /// Current pump state
    #[inline]
    pub fn state(&self) -> PumpState {
        PumpState::from(self.state.load(Ordering::Acquire))
    }

    /// Configuration this gateway was built with
    #[inline]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Snapshot of activity counters
    pub fn stats(&self) -> GatewayStats {
        let s = &self.stats;
        GatewayStats {
            calls_inline: s.inline.load(Ordering::Relaxed),
            calls_queued: s.queued.load(Ordering::Relaxed),
            calls_completed: s.completed.load(Ordering::Relaxed),
            calls_failed: s.failed.load(Ordering::Relaxed),
            calls_abandoned: s.abandoned.load(Ordering::Relaxed),
            posts_run: s.posts.load(Ordering::Relaxed),
            drains: s.drains.load(Ordering::Relaxed),
        }
    }

    /// Execute every call queued at this instant, in FIFO order
    ///
    /// Owner thread only. Each request is signaled as soon as it finishes.
    /// Calls that arrive during the drain wait for the next pass; their
    /// enqueue has already set the wake signal again.
    pub(crate) fn drain(&self) -> usize {
        let batch = self.queue.len();
        let mut handled = 0;

        for _ in 0..batch {
            let Some(call) = self.queue.pop() else {
                break;
            };
            match call {
                QueuedCall::Request(request) => match request.execute() {
                    Some(succeeded) => {
                        self.stats.completed.fetch_add(1, Ordering::Relaxed);
                        if !succeeded {
                            self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        }
                        #[cfg(feature = "debug-logging")]
                        ktrace!("call #{} done, ok={}", request.seq(), succeeded);
                    }
                    None => ktrace!("call #{} was abandoned, skipped", request.seq()),
                },
                QueuedCall::Post(job) => {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        kerror!("posted call panicked: {}", panic_message(payload.as_ref()));
                    }
                    self.stats.posts.fetch_add(1, Ordering::Relaxed);
                }
            }
            handled += 1;
        }

        self.stats.drains.fetch_add(1, Ordering::Relaxed);
        handled
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        // Requesters borrow the gateway, so nobody is blocked on what is
        // left here: only abandoned requests and unserviced posts.
        let mut leftover = 0usize;
        while let Some(call) = self.queue.pop() {
            if let QueuedCall::Request(request) = call {
                request.release();
            }
            leftover += 1;
        }
        if leftover > 0 {
            kdebug!("gateway dropped with {} unserviced calls", leftover);
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("owner", &self.owner)
            .field("state", &self.state())
            .field("pending", &self.queue.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
