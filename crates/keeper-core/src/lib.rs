//! # keeper-core
//!
//! Core types and traits for the owner-thread call gateway.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Wait signals, the gateway itself and the pump loop live in
//! `keeper-runtime`.
//!
//! ## Modules
//!
//! - `id` - Owner thread identity
//! - `state` - Pump and call request state enums
//! - `cancel` - Cancellation token with waiter registration
//! - `error` - Error types
//! - `traits` - Wakeup trait implemented by platform signals
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod cancel;
pub mod error;
pub mod traits;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::OwnerId;
pub use state::{CallState, PumpState};
pub use cancel::{CancellationToken, Registration};
pub use error::{BoxError, KeeperError, KeeperResult, WorkerError};
pub use traits::Wakeup;
pub use env::{env_get, env_get_bool, env_get_ms, env_get_opt};
