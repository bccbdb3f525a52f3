//! Owner thread identity

use core::fmt;
use std::thread::{self, ThreadId};

/// Identity of the thread that owns a gateway
///
/// Captured once when the gateway is built and never changes afterwards.
/// Only the owner may run the pump loop and execute marshaled calls.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OwnerId(ThreadId);

impl OwnerId {
    /// Capture the calling thread as owner
    #[inline]
    pub fn current() -> Self {
        OwnerId(thread::current().id())
    }

    /// Check if the calling thread is this owner
    #[inline]
    pub fn is_current(self) -> bool {
        thread::current().id() == self.0
    }
}

impl From<ThreadId> for OwnerId {
    #[inline]
    fn from(id: ThreadId) -> Self {
        OwnerId(id)
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({:?})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_is_current() {
        let owner = OwnerId::current();
        assert!(owner.is_current());
        assert_eq!(owner, OwnerId::from(thread::current().id()));
    }

    #[test]
    fn test_other_thread_is_not_owner() {
        let owner = OwnerId::current();
        let seen = thread::spawn(move || owner.is_current()).join().unwrap();
        assert!(!seen);
    }

    #[test]
    fn test_from_thread_id() {
        let id = thread::current().id();
        assert_eq!(OwnerId::from(id), OwnerId::current());
    }
}
