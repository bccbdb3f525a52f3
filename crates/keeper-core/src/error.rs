//! Error types for the owner-thread call gateway

use core::fmt;

/// Boxed error carried across threads by marshaled calls
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for gateway operations
pub type KeeperResult<T> = Result<T, KeeperError>;

/// Errors that can occur in gateway operations
#[derive(Debug)]
pub enum KeeperError {
    /// Operation was cancelled via CancellationToken
    Cancelled,

    /// A marshaled call returned an error (original error preserved)
    Propagated(BoxError),

    /// The background operation failed
    Operation(BoxError),

    /// `run_to_completion` was called from a thread other than the owner
    NotOwnerThread,

    /// The gateway has already serviced a run
    AlreadyStarted,

    /// Configuration rejected by `validate`
    InvalidConfig(&'static str),

    /// Background thread error
    Worker(WorkerError),
}

impl KeeperError {
    /// Wrap any error as a background operation failure
    pub fn operation(e: impl Into<BoxError>) -> Self {
        KeeperError::Operation(e.into())
    }

    /// Check if this is the cancellation outcome
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KeeperError::Cancelled)
    }

    /// The wrapped error of a `Propagated` or `Operation` failure
    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            KeeperError::Propagated(e) | KeeperError::Operation(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for KeeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeeperError::Cancelled => write!(f, "operation cancelled"),
            // Transparent: the requester sees the original message
            KeeperError::Propagated(e) => write!(f, "{}", e),
            KeeperError::Operation(e) => write!(f, "background operation failed: {}", e),
            KeeperError::NotOwnerThread => write!(f, "not called from the owner thread"),
            KeeperError::AlreadyStarted => write!(f, "gateway already started"),
            KeeperError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            KeeperError::Worker(e) => write!(f, "worker error: {}", e),
        }
    }
}

impl std::error::Error for KeeperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeeperError::Propagated(e) | KeeperError::Operation(e) => Some(e.as_ref()),
            KeeperError::Worker(e) => Some(e),
            _ => None,
        }
    }
}

/// Background thread related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn the background operation thread
    SpawnFailed,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed => write!(f, "failed to spawn background thread"),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<WorkerError> for KeeperError {
    fn from(e: WorkerError) -> Self {
        KeeperError::Worker(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DiskFull;

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk full")
        }
    }

    impl std::error::Error for DiskFull {}

    #[test]
    fn test_error_display() {
        let e = KeeperError::Cancelled;
        assert_eq!(format!("{}", e), "operation cancelled");

        let e = KeeperError::Propagated("boom".into());
        assert_eq!(format!("{}", e), "boom");

        let e = KeeperError::operation("disk full");
        assert_eq!(format!("{}", e), "background operation failed: disk full");

        let e = KeeperError::Worker(WorkerError::SpawnFailed);
        assert_eq!(format!("{}", e), "worker error: failed to spawn background thread");
    }

    #[test]
    fn test_error_conversion() {
        let err: KeeperError = WorkerError::SpawnFailed.into();
        assert!(matches!(err, KeeperError::Worker(WorkerError::SpawnFailed)));
    }

    #[test]
    fn test_propagated_keeps_identity() {
        let e = KeeperError::Propagated(Box::new(DiskFull));
        let inner = e.inner().unwrap();
        assert!(inner.downcast_ref::<DiskFull>().is_some());
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(KeeperError::Cancelled.is_cancelled());
        assert!(!KeeperError::AlreadyStarted.is_cancelled());
        assert!(KeeperError::NotOwnerThread.inner().is_none());
    }
}
