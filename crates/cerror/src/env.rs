//! Environment variable helpers
//!
//! Typed parsing with defaults, used by `config` and `kprint`.
//!
//! ```ignore
//! use cerror::env::{env_get, env_get_bool};
//!
//! let depth: usize = env_get("CERR_STACK_DEPTH", 10);
//! let capture = env_get_bool("CERR_STACK_CAPTURE", true);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as `T`, or `default` if unset or unparsable.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean.
///
/// "1", "true", "yes", "on" are true and "0", "false", "no", "off" are false
/// (case-insensitive). Unset or anything else returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// `Some(T)` if the variable is set and parses, `None` otherwise.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
