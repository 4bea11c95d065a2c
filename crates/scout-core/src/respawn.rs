//! Respawn timing for killed bosses.
//!
//! A boss comes back 72 hours after it dies, unless the weekly server reset
//! (Tuesday 10:00 UTC-5, i.e. 15:00 UTC, no daylight saving) happens first.

use chrono::{DateTime, Duration, Utc};

/// Fixed cooldown between a kill and the natural respawn.
pub const RESPAWN_COOLDOWN_HOURS: i64 = 72;

const SECS_PER_WEEK: i64 = 7 * 24 * 3600;

/// Offset of the weekly reset from the Unix epoch's week start.
///
/// 1970-01-01 was a Thursday, so Tuesday 15:00 UTC is 5 days and 15 hours in.
const RESET_OFFSET_SECS: i64 = 5 * 24 * 3600 + 15 * 3600;

/// The first weekly reset at or after `at`.
pub fn next_weekly_reset(at: DateTime<Utc>) -> DateTime<Utc> {
    let ahead = (RESET_OFFSET_SECS - at.timestamp()).rem_euclid(SECS_PER_WEEK);
    let whole_second = at - Duration::nanoseconds(i64::from(at.timestamp_subsec_nanos()));
    let candidate = whole_second + Duration::seconds(ahead);
    if candidate < at {
        candidate + Duration::seconds(SECS_PER_WEEK)
    } else {
        candidate
    }
}

/// When a layer killed at `event` becomes eligible to respawn.
pub fn next_respawn(event: DateTime<Utc>) -> DateTime<Utc> {
    let cooldown = event + Duration::hours(RESPAWN_COOLDOWN_HOURS);
    cooldown.min(next_weekly_reset(event))
}
