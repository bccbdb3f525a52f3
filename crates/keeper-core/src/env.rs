//! Environment variable utilities
//!
//! Typed lookups with defaults, used by `GatewayConfig::from_env()`.
//!
//! ```ignore
//! use keeper_core::env::{env_get, env_get_bool, env_get_ms};
//!
//! let name: String = env_get("KEEPER_THREAD_NAME", "keeper-bg".to_string());
//! let debug = env_get_bool("KEEPER_DEBUG", false);
//! let poll = env_get_ms("KEEPER_POLL_INTERVAL_MS", 0);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Get environment variable parsed as type T, or return default
///
/// Unset variables and values that fail to parse both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
///
/// Returns `Some(T)` if the variable is set and parses successfully.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as a millisecond duration
#[inline]
pub fn env_get_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_get(key, default_ms))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__KEEPER_TEST_UNSET_VAR__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<usize> = env_get_opt("__KEEPER_TEST_UNSET_VAR__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__KEEPER_TEST_NUM__", " 123 ");
        let val: usize = env_get("__KEEPER_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__KEEPER_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__KEEPER_TEST_UNSET_VAR__", true));

        std::env::set_var("__KEEPER_TEST_BOOL__", "YES");
        assert!(env_get_bool("__KEEPER_TEST_BOOL__", false));

        std::env::set_var("__KEEPER_TEST_BOOL__", "on");
        assert!(env_get_bool("__KEEPER_TEST_BOOL__", false));

        std::env::set_var("__KEEPER_TEST_BOOL__", "0");
        assert!(!env_get_bool("__KEEPER_TEST_BOOL__", true));

        std::env::set_var("__KEEPER_TEST_BOOL__", "garbage");
        assert!(!env_get_bool("__KEEPER_TEST_BOOL__", true));

        std::env::remove_var("__KEEPER_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_ms() {
        std::env::set_var("__KEEPER_TEST_MS__", "250");
        assert_eq!(env_get_ms("__KEEPER_TEST_MS__", 1), Duration::from_millis(250));
        std::env::set_var("__KEEPER_TEST_MS__", "soon");
        assert_eq!(env_get_ms("__KEEPER_TEST_MS__", 1), Duration::from_millis(1));
        std::env::remove_var("__KEEPER_TEST_MS__");
    }
}
