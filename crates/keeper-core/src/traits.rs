//! Platform traits
//!
//! These traits define the interface between platform-agnostic core
//! and platform-specific runtime implementations.

/// Something a cancellation token can wake
///
/// Implemented by the runtime's wait signals (and by call requests, which
/// forward to their private completion signal). `wake` must never block.
pub trait Wakeup: Send + Sync {
    /// Wake whoever is waiting on this object
    fn wake(&self);
}
