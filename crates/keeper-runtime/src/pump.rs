//! # Pump - drive a background operation from the owner thread
//!
//! `run_to_completion` starts the operation on a scoped background thread
//! and turns the owner thread into a call pump:
//! 1. Read the completion flag
//! 2. Drain every queued call (FIFO, signal each as it finishes)
//! 3. Exit if the flag was already set in step 1
//! 4. Otherwise wait on the wake signal and go to 1
//!
//! Reading the flag before the drain is what guarantees one full drain
//! after completion, so a call queued just before the operation returned
//! is never stranded.

use crate::gateway::{panic_message, Gateway};
use crate::parking::WaitSignal;

use keeper_core::{
    kdebug, kerror, kinfo, CancellationToken, KeeperError, KeeperResult, PumpState,
    WorkerError,
};

use std::panic;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

/// Marks the operation finished and wakes the pump, even on panic
struct CompletionGuard<'a> {
    gateway: &'a Gateway,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.gateway.operation_done.store(true, Ordering::Release);
        self.gateway.wake.set();
    }
}

impl Gateway {
    /// Run `operation` to completion while servicing marshaled calls
    ///
    /// Must be called on the owner thread, once per gateway. The operation
    /// runs on a background thread and receives the shared cancellation
    /// token; it (and any threads it spawns) may call `call`/`try_call`/
    /// `post` at any time. Returns the operation's result once it has
    /// finished and every call queued before that point has been served.
    ///
    /// Afterwards the gateway is closed: it reports cancelled, and a call
    /// from any thread other than the owner returns `Err(Cancelled)`
    /// instead of waiting for a pump that will never run again.
    ///
    /// A panic in the operation is re-raised here after the final drain.
    pub fn run_to_completion<T, F>(&self, operation: F) -> KeeperResult<T>
    where
        F: FnOnce(&CancellationToken) -> KeeperResult<T> + Send,
        T: Send,
    {
        if !self.owner.is_current() {
            return Err(KeeperError::NotOwnerThread);
        }

        self.state
            .compare_exchange(
                PumpState::Idle as u8,
                PumpState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| KeeperError::AlreadyStarted)?;

        let started = Instant::now();
        self.log_lifecycle(format_args!(
            "pump started, thread={}",
            self.config.thread_name
        ));

        let joined: KeeperResult<thread::Result<KeeperResult<T>>> = thread::scope(|scope| {
            let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
            if let Some(size) = self.config.stack_size {
                builder = builder.stack_size(size);
            }

            let handle = builder
                .spawn_scoped(scope, move || {
                    let _done = CompletionGuard { gateway: self };
                    operation(&self.token)
                })
                .map_err(|e| {
                    kerror!("failed to spawn background thread: {}", e);
                    KeeperError::from(WorkerError::SpawnFailed)
                })?;

            self.pump();
            Ok(handle.join())
        });
        self.close();

        let (state, result) = match joined {
            Err(e) => (PumpState::Failed, Err(e)),
            Ok(Err(payload)) => {
                self.finish(PumpState::Failed, started);
                kerror!(
                    "background operation panicked: {}",
                    panic_message(payload.as_ref())
                );
                panic::resume_unwind(payload);
            }
            Ok(Ok(Ok(value))) => (PumpState::Completed, Ok(value)),
            Ok(Ok(Err(e))) if e.is_cancelled() => (PumpState::Cancelled, Err(e)),
            Ok(Ok(Err(e))) => (PumpState::Failed, Err(e)),
        };

        self.finish(state, started);
        result
    }

    /// Owner loop: drain until the operation is done and drained once more
    fn pump(&self) {
        loop {
            let finished = self.operation_done.load(Ordering::Acquire);
            self.drain();
            if finished {
                break;
            }
            // Event-driven unless configured for degraded polling
            self.wake.wait(self.config.poll_interval);
        }
    }

    fn finish(&self, state: PumpState, started: Instant) {
        self.state.store(state as u8, Ordering::Release);
        let stats = self.stats();
        self.log_lifecycle(format_args!(
            "pump finished: {:?} in {:?} (queued={} completed={} abandoned={} posts={} drains={})",
            state,
            started.elapsed(),
            stats.calls_queued,
            stats.calls_completed,
            stats.calls_abandoned,
            stats.posts_run,
            stats.drains,
        ));
    }

    fn log_lifecycle(&self, args: std::fmt::Arguments<'_>) {
        if self.config.debug_logging {
            kinfo!("{}", args);
        } else {
            kdebug!("{}", args);
        }
    }
}
