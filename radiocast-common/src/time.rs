//! Timestamp utilities
//!
//! Schedule timestamps are persisted as integer milliseconds since the UNIX
//! epoch; these helpers convert between that and `DateTime<Utc>`.

use chrono::{DateTime, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a timestamp to milliseconds since the UNIX epoch
pub fn to_epoch_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert milliseconds since the UNIX epoch to a UTC timestamp
///
/// Out-of-range values fall back to the epoch itself.
pub fn from_epoch_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}
