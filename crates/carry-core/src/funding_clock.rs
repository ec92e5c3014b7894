//! Funding clock utilities.
//!
//! Perpetual funding settles every 8 hours at 00:00, 08:00 and 16:00 UTC.
//! The executor keys its collect/unwind windows off the time remaining
//! until the next settlement.
//!
//! All functions have `*_at(dt)` variants so tests never depend on wall
//! time.

use chrono::{DateTime, Duration, Timelike, Utc};

/// Hours between funding settlements.
pub const FUNDING_INTERVAL_HOURS: u32 = 8;

/// Next funding settlement strictly after `dt`.
///
/// A timestamp exactly on a settlement boundary maps to the following
/// epoch: at 08:00:00 the current settlement has already fired.
#[must_use]
pub fn next_funding_at(dt: DateTime<Utc>) -> DateTime<Utc> {
    let next_block = (dt.hour() / FUNDING_INTERVAL_HOURS + 1) * FUNDING_INTERVAL_HOURS;
    let midnight = dt
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    midnight + Duration::hours(i64::from(next_block))
}

/// Next funding settlement strictly after now.
#[must_use]
pub fn next_funding_now() -> DateTime<Utc> {
    next_funding_at(Utc::now())
}

/// Time remaining until the next funding settlement after `dt`.
#[must_use]
pub fn time_to_funding_at(dt: DateTime<Utc>) -> Duration {
    next_funding_at(dt) - dt
}

/// Time remaining until the next funding settlement after now.
#[must_use]
pub fn time_to_funding_now() -> Duration {
    time_to_funding_at(Utc::now())
}

/// Format a duration as a compact human-readable string.
///
/// Negative durations render as `"0s"`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_next_funding_mid_epoch() {
        let dt = utc(2024, 3, 1, 3, 15, 0);
        assert_eq!(next_funding_at(dt), utc(2024, 3, 1, 8, 0, 0));

        let dt = utc(2024, 3, 1, 12, 0, 1);
        assert_eq!(next_funding_at(dt), utc(2024, 3, 1, 16, 0, 0));
    }

    #[test]
    fn test_next_funding_on_boundary_maps_forward() {
        let dt = utc(2024, 3, 1, 8, 0, 0);
        assert_eq!(next_funding_at(dt), utc(2024, 3, 1, 16, 0, 0));
    }

    #[test]
    fn test_next_funding_wraps_to_next_day() {
        let dt = utc(2024, 3, 1, 23, 30, 0);
        assert_eq!(next_funding_at(dt), utc(2024, 3, 2, 0, 0, 0));
    }

    #[test]
    fn test_time_to_funding() {
        let dt = utc(2024, 3, 1, 7, 55, 0);
        assert_eq!(time_to_funding_at(dt), Duration::minutes(5));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(330)), "5m 30s");
        assert_eq!(format_duration(Duration::seconds(7530)), "2h 05m 30s");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
