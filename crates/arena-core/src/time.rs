//! Wall-clock timestamps.
//!
//! All arena operations take `now` as an argument so the core stays
//! deterministic under test; only the server reads the real clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .min(u64::MAX as u128) as Millis
}

/// Convert a millisecond span to fractional seconds for display.
pub fn as_seconds(span: Millis) -> f64 {
    span as f64 / 1000.0
}
