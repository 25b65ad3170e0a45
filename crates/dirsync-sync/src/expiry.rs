//! Account expiration classifier.
//!
//! Day offsets follow the "positive means already expired" convention:
//! an account that expired three days ago has offset `3`.

use chrono::{DateTime, Utc};
use dirsync_connector_ldap::ad::filetime::{
    datetime_to_filetime, filetime_to_datetime, NEVER_EXPIRES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset reported for accounts that never expire. Outside every window.
pub const NEVER_EXPIRES_OFFSET: i64 = 106_752;

/// Notification tier of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryTier {
    NeverExpires,
    /// Offset -7.
    AlreadyExpired,
    /// Offset -30.
    ExpiredAndDisabled,
    /// Offset 7 or 14.
    ExpiringSoon,
    NoAction,
}

impl ExpiryTier {
    /// Markdown template used for the reminder.
    pub fn template(self) -> Option<&'static str> {
        match self {
            ExpiryTier::AlreadyExpired => Some("account_expired"),
            ExpiryTier::ExpiredAndDisabled => Some("account_expired_disabled"),
            ExpiryTier::ExpiringSoon => Some("account_expiring"),
            ExpiryTier::NeverExpires | ExpiryTier::NoAction => None,
        }
    }
}

impl fmt::Display for ExpiryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpiryTier::NeverExpires => "never_expires",
            ExpiryTier::AlreadyExpired => "already_expired",
            ExpiryTier::ExpiredAndDisabled => "expired_and_disabled",
            ExpiryTier::ExpiringSoon => "expiring_soon",
            ExpiryTier::NoAction => "no_action",
        };
        f.write_str(s)
    }
}

/// FILETIME ticks (100 ns) per day.
const TICKS_PER_DAY: i64 = 864_000_000_000;

/// Whole days from expiry to `now`, floored.
///
/// Computed on FILETIME ticks so a partial day never rounds toward zero.
///
/// Returns [`NEVER_EXPIRES_OFFSET`] for the never-expires sentinel and for
/// native values that cannot be represented as a calendar time.
pub fn day_offset(native: i64, now: DateTime<Utc>) -> i64 {
    if native == NEVER_EXPIRES {
        return NEVER_EXPIRES_OFFSET;
    }
    if filetime_to_datetime(native).is_none() {
        return NEVER_EXPIRES_OFFSET;
    }
    datetime_to_filetime(now)
        .checked_sub(native)
        .map_or(NEVER_EXPIRES_OFFSET, |ticks| ticks.div_euclid(TICKS_PER_DAY))
}

/// Tier of a day offset.
pub fn classify_offset(offset: i64) -> ExpiryTier {
    match offset {
        NEVER_EXPIRES_OFFSET => ExpiryTier::NeverExpires,
        -7 => ExpiryTier::AlreadyExpired,
        -30 => ExpiryTier::ExpiredAndDisabled,
        7 | 14 => ExpiryTier::ExpiringSoon,
        _ => ExpiryTier::NoAction,
    }
}

/// Tier of a directory-native expiration value at `now`.
pub fn classify_expiry(native: i64, now: DateTime<Utc>) -> ExpiryTier {
    classify_offset(day_offset(native, now))
}
