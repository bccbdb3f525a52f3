//! # keeper-runtime
//!
//! Runtime implementation of the owner-thread call gateway.
//!
//! This crate provides:
//! - Wait signals (futex on Linux, condvar elsewhere)
//! - Call requests with a lock-free state machine
//! - The `Gateway` (call marshaling, cancellation, posts)
//! - The pump loop that drives a background operation to completion

pub mod config;
pub mod parking;
pub mod gateway;
pub mod pump;
mod request;

// Re-exports
pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayStats};
pub use parking::{new_signal, PlatformSignal, WaitSignal};
