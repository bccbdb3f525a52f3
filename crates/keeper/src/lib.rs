//! # keeper - owner-thread call gateway
//!
//! Run a long operation on a background thread while every call that must
//! happen on one particular thread (GUI state, a thread-bound handle, a
//! non-`Send` resource) is marshaled back to that thread and executed there.
//!
//! ## Features
//!
//! - **Thread affinity**: calls always run on the owner thread, FIFO per producer
//! - **Reentrant**: calls made on the owner thread run inline, never deadlock
//! - **Borrowing**: blocking calls may borrow from the caller's stack
//! - **Cancellation**: one token wakes every blocked requester and the pump
//! - **Error transport**: errors and panics come back to the thread that asked
//! - **Event-driven**: the owner sleeps on a futex until there is work
//!
//! ## Quick Start
//!
//! ```ignore
//! use keeper::{block_on, GatewayConfig};
//!
//! fn main() {
//!     let mut label = String::new();
//!     let total = block_on(GatewayConfig::default(), |gw, token| {
//!         std::thread::scope(|s| {
//!             for i in 0..4 {
//!                 s.spawn(move || gw.call(|| println!("update {} on owner", i)));
//!             }
//!         });
//!         token.check()?;
//!         gw.call(|| label.push_str("done"))?;
//!         Ok(4)
//!     })
//!     .unwrap();
//!     assert_eq!(total, 4);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Background operation (+ threads it spawns)         │
//! │               call(), try_call(), post(), token             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ push + wake
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Gateway queue (SegQueue, MPSC)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ drain
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Owner thread pump (run_to_completion)         │
//! │        execute, signal requester, wait on wake signal       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use keeper_core::{
    // Identity and state
    OwnerId, CallState, PumpState,
    // Cancellation
    CancellationToken, Registration, Wakeup,
    // Errors
    BoxError, KeeperError, KeeperResult, WorkerError,
};

// Re-export kprint macros for debug logging
pub use keeper_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use keeper_core::kprint::{
    LogLevel, init as init_logging, set_log_level, set_flush_enabled, set_time_enabled,
};

// Re-export env helpers
pub use keeper_core::{env_get, env_get_bool, env_get_ms, env_get_opt};

// Re-export runtime types
pub use keeper_runtime::{Gateway, GatewayConfig, GatewayStats};

/// Run `operation` in the background while the calling thread services calls
///
/// This is the typical entry point for applications. The calling thread
/// becomes the owner: it builds a gateway with `config`, lends it to the
/// operation and pumps calls until the operation has finished. The run
/// closes the gateway when it ends, so a detached thread still holding a
/// clone of the token observes cancellation and can wind down.
pub fn block_on<F, T>(config: GatewayConfig, operation: F) -> KeeperResult<T>
where
    F: FnOnce(&Gateway, &CancellationToken) -> KeeperResult<T> + Send,
    T: Send,
{
    let gateway = Gateway::with_config(config)?;
    gateway.run_to_completion(|token| operation(&gateway, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_block_on_marshals_to_caller() {
        let owner = thread::current().id();
        let mut ran_on = Vec::new();

        let n = block_on(GatewayConfig::builtin(), |gw, _token| {
            thread::scope(|s| {
                s.spawn(|| gw.call(|| ran_on.push(thread::current().id())));
            });
            Ok(ran_on.len())
        })
        .unwrap();

        assert_eq!(n, 1);
        assert_eq!(ran_on, vec![owner]);
    }

    #[test]
    fn test_block_on_rejects_bad_config() {
        let config = GatewayConfig::builtin().thread_name("");
        let err = block_on(config, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidConfig(_)));
    }

    #[test]
    fn test_block_on_cancels_after_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = std::sync::mpsc::channel();

        block_on(GatewayConfig::builtin(), |_gw, token| {
            // Detached thread holding a token clone outlives the operation
            let token = token.clone();
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                while !token.is_cancelled() {
                    thread::sleep(std::time::Duration::from_millis(1));
                }
                hits.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            });
            Ok(())
        })
        .unwrap();

        rx.recv().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_operation_error_passes_through() {
        let err = block_on(GatewayConfig::builtin(), |gw, _| -> KeeperResult<()> {
            gw.try_call(|| Err::<(), _>("not found"))?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "not found");
    }
}
