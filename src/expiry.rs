// Expiry durations as accepted by the service ("24h", "7d", "1h 30m").
// The allowed maximum depends on whether the caller holds an API key, and is
// enforced here so an over-long request never leaves the machine.

use crate::error::{ClientError, Result};
use std::time::Duration;

/// Longest expiry accepted for anonymous uploads.
pub const MAX_DAYS_ANONYMOUS: u64 = 128;
/// Longest expiry accepted when an API key is configured.
pub const MAX_DAYS_WITH_KEY: u64 = 730;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parse a human duration string.
pub fn parse(expires: &str) -> Result<Duration> {
    humantime::parse_duration(expires.trim())
        .map_err(|e| ClientError::Validation(format!("invalid expiry duration '{}': {}", expires, e)))
}

pub fn max_days(has_api_key: bool) -> u64 {
    if has_api_key {
        MAX_DAYS_WITH_KEY
    } else {
        MAX_DAYS_ANONYMOUS
    }
}

/// Parse `expires` and check it against the cap for the caller's key status.
pub fn validate(expires: &str, has_api_key: bool) -> Result<Duration> {
    let duration = parse(expires)?;
    let days = max_days(has_api_key);
    if duration > Duration::from_secs(days * SECS_PER_DAY) {
        let who = if has_api_key { "with" } else { "without" };
        return Err(ClientError::Validation(format!(
            "maximum expiry {} API key is {} days",
            who, days
        )));
    }
    Ok(duration)
}
