//! Directory-native timestamps.
//!
//! `accountExpires`, `pwdLastSet` and `lockoutTime` count 100-nanosecond
//! ticks since 1601-01-01 UTC. `0` and `i64::MAX` both mean "never"
//! for `accountExpires`.

use chrono::{DateTime, TimeZone, Utc};

/// `accountExpires` value meaning the account never expires.
pub const NEVER_EXPIRES: i64 = i64::MAX;

const TICKS_PER_SECOND: i64 = 10_000_000;
/// Seconds between 1601-01-01 and 1970-01-01.
const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;

/// Convert a directory-native timestamp to UTC. `None` for values chrono cannot represent.
pub fn filetime_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND) - EPOCH_DIFFERENCE_SECS;
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Convert UTC time to a directory-native timestamp, saturating at the type bounds.
pub fn datetime_to_filetime(at: DateTime<Utc>) -> i64 {
    let secs = at.timestamp().saturating_add(EPOCH_DIFFERENCE_SECS);
    let sub = i64::from(at.timestamp_subsec_nanos() / 100);
    secs.saturating_mul(TICKS_PER_SECOND).saturating_add(sub)
}
