//! Gateway configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use keeper_runtime::config::GatewayConfig;
//!
//! // Defaults with env overrides
//! let config = GatewayConfig::from_env();
//!
//! // Or customize programmatically
//! let config = GatewayConfig::from_env()
//!     .thread_name("upload-bg")
//!     .poll_interval(Some(Duration::from_millis(1)));
//! ```

use keeper_core::env::{env_get, env_get_bool, env_get_ms};
use std::time::Duration;

/// Library defaults
pub mod defaults {
    /// Poll interval in milliseconds; 0 means event-driven waiting
    pub const POLL_INTERVAL_MS: u64 = 0;
    /// Name of the background operation thread
    pub const THREAD_NAME: &str = "keeper-bg";
    /// Background thread stack size; 0 means platform default
    pub const STACK_SIZE: usize = 0;
    /// Smallest accepted explicit stack size
    pub const MIN_STACK_SIZE: usize = 16 * 1024;
    /// Log gateway lifecycle at info instead of debug
    pub const DEBUG_LOGGING: bool = false;
}

/// Gateway configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bounded poll interval for the pump's wait
    ///
    /// `None` (the default) waits purely on the wake signal. `Some(d)` is
    /// the degraded polling mode: the pump also wakes every `d`.
    pub poll_interval: Option<Duration>,
    /// Name given to the background operation's thread
    pub thread_name: String,
    /// Stack size for the background operation's thread
    pub stack_size: Option<usize>,
    /// Enable debug logging of the gateway lifecycle
    pub debug_logging: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl GatewayConfig {
    /// Library defaults, ignoring the environment
    pub fn builtin() -> Self {
        Self {
            poll_interval: None,
            thread_name: defaults::THREAD_NAME.to_string(),
            stack_size: None,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `KEEPER_POLL_INTERVAL_MS` - Degraded polling interval (0 = event-driven)
    /// - `KEEPER_THREAD_NAME` - Background thread name
    /// - `KEEPER_STACK_SIZE` - Background thread stack size (0 = default)
    /// - `KEEPER_DEBUG` - Enable debug logging (0/1)
    pub fn from_env() -> Self {
        let poll = env_get_ms("KEEPER_POLL_INTERVAL_MS", defaults::POLL_INTERVAL_MS);
        let stack: usize = env_get("KEEPER_STACK_SIZE", defaults::STACK_SIZE);

        Self {
            poll_interval: (!poll.is_zero()).then_some(poll),
            thread_name: env_get("KEEPER_THREAD_NAME", defaults::THREAD_NAME.to_string()),
            stack_size: (stack != 0).then_some(stack),
            debug_logging: env_get_bool("KEEPER_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    // Builder methods

    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: Option<usize>) -> Self {
        self.stack_size = size;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.thread_name.is_empty() {
            return Err("thread_name must not be empty");
        }
        if self.thread_name.contains('\0') {
            return Err("thread_name must not contain NUL");
        }
        if matches!(self.poll_interval, Some(d) if d.is_zero()) {
            return Err("poll_interval must be > 0 when set");
        }
        if matches!(self.stack_size, Some(s) if s < defaults::MIN_STACK_SIZE) {
            return Err("stack_size must be >= 16KB");
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("Gateway Configuration:");
        eprintln!("  poll_interval:  {:?}", self.poll_interval);
        eprintln!("  thread_name:    {}", self.thread_name);
        eprintln!("  stack_size:     {:?}", self.stack_size);
        eprintln!("  debug_logging:  {}", self.debug_logging);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let config = GatewayConfig::builtin();
        assert!(config.validate().is_ok());
        assert!(config.poll_interval.is_none());
        assert_eq!(config.thread_name, "keeper-bg");
        assert!(config.stack_size.is_none());
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::builtin()
            .thread_name("upload-bg")
            .poll_interval(Some(Duration::from_millis(1)))
            .stack_size(Some(256 * 1024))
            .debug_logging(true);
        assert_eq!(config.thread_name, "upload-bg");
        assert_eq!(config.poll_interval, Some(Duration::from_millis(1)));
        assert_eq!(config.stack_size, Some(256 * 1024));
        assert!(config.debug_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(GatewayConfig::builtin().thread_name("").validate().is_err());
        assert!(GatewayConfig::builtin()
            .poll_interval(Some(Duration::ZERO))
            .validate()
            .is_err());
        assert!(GatewayConfig::builtin()
            .stack_size(Some(1024))
            .validate()
            .is_err());
    }
}
