//! Engine configuration from environment variables.
//!
//! All values are loaded from `TESTLOCK_*` variables with defaults; invalid
//! values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `TESTLOCK_TICK_MILLIS` | 100 | Clock sampling cadence (ms) |
//! | `TESTLOCK_RESIZE_HEIGHT_TOLERANCE` | 200 | Allowed height delta vs screen (px) |
//! | `TESTLOCK_RESIZE_WIDTH_TOLERANCE` | 150 | Allowed width delta vs screen (px) |
//! | `TESTLOCK_KEYBOARD_HEIGHT_MARGIN` | 100 | Min height drop read as keyboard (px) |
//! | `TESTLOCK_KEYBOARD_WIDTH_JITTER` | 16 | Max width change still "unchanged" (px) |
//! | `TESTLOCK_SUBMIT_MAX_ATTEMPTS` | 7 | Submission delivery attempts |
//! | `TESTLOCK_SUBMIT_INITIAL_DELAY_MS` | 1000 | Backoff base delay (ms) |
//! | `TESTLOCK_LOG_LEVEL` | info | Env-filter directive |
//! | `TESTLOCK_LOG_FORMAT` | json | `json` or `pretty` |

use std::time::Duration;

use crate::integrity::IntegrityConfig;
use crate::session::DriverConfig;
use crate::submit::RetryPolicy;
use crate::telemetry::{LogConfig, LogFormat};

/// All engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub driver: DriverConfig,
    pub log: LogConfig,
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn load_integrity() -> IntegrityConfig {
    let defaults = IntegrityConfig::default();
    IntegrityConfig {
        resize_height_tolerance: parse_u32(
            "TESTLOCK_RESIZE_HEIGHT_TOLERANCE",
            defaults.resize_height_tolerance,
        ),
        resize_width_tolerance: parse_u32(
            "TESTLOCK_RESIZE_WIDTH_TOLERANCE",
            defaults.resize_width_tolerance,
        ),
        keyboard_height_margin: parse_u32(
            "TESTLOCK_KEYBOARD_HEIGHT_MARGIN",
            defaults.keyboard_height_margin,
        ),
        keyboard_width_jitter: parse_u32(
            "TESTLOCK_KEYBOARD_WIDTH_JITTER",
            defaults.keyboard_width_jitter,
        ),
    }
}

fn load_retry() -> RetryPolicy {
    let defaults = RetryPolicy::default();
    let max_attempts = parse_u32("TESTLOCK_SUBMIT_MAX_ATTEMPTS", defaults.max_attempts).max(1);
    let initial_delay_ms = parse_u64(
        "TESTLOCK_SUBMIT_INITIAL_DELAY_MS",
        defaults.initial_delay.as_millis() as u64,
    );
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(initial_delay_ms.max(1)),
    }
}

fn load_log() -> LogConfig {
    let level = std::env::var("TESTLOCK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let format = match std::env::var("TESTLOCK_LOG_FORMAT").as_deref() {
        Ok("pretty") => LogFormat::Pretty,
        _ => LogFormat::Json,
    };
    LogConfig { format, level }
}

/// Load the full configuration from the environment.
pub fn load() -> EnvConfig {
    let tick_ms = parse_u64("TESTLOCK_TICK_MILLIS", 100).max(1);
    EnvConfig {
        driver: DriverConfig {
            tick_interval: Duration::from_millis(tick_ms),
            integrity: load_integrity(),
            retry: load_retry(),
        },
        log: load_log(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        // Avoid env mutation in tests: exercise the fallbacks directly.
        assert_eq!(parse_u32("TESTLOCK_UNSET_TEST_KEY", 42), 42);
        assert_eq!(parse_u64("TESTLOCK_UNSET_TEST_KEY", 7), 7);
        let config = load();
        assert_eq!(config.driver.retry.max_attempts, 7);
        assert_eq!(config.driver.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.driver.integrity.resize_height_tolerance, 200);
    }
}
