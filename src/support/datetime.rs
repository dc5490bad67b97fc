//! Timestamp formatting without a calendar dependency.
//!
//! SQLite's `datetime('now')` produces `YYYY-MM-DD HH:MM:SS`; JSON payloads
//! carry ISO 8601 (`YYYY-MM-DDTHH:MM:SSZ`). Timestamps written from Rust are
//! generated directly in the ISO form, so `to_iso8601` only has to fix up
//! rows that came from the SQL default.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Normalize a SQLite text timestamp to ISO 8601.
///
/// `"2026-08-07 12:34:56"` becomes `"2026-08-07T12:34:56Z"`. Strings that
/// already look ISO (contain a `T`) pass through with a `Z` appended only
/// if missing; anything unrecognized is returned unchanged.
pub fn to_iso8601(timestamp: &str) -> String {
    if timestamp.len() == 19 && timestamp.as_bytes().get(10) == Some(&b' ') {
        let mut out = String::with_capacity(20);
        out.push_str(&timestamp[..10]);
        out.push('T');
        out.push_str(&timestamp[11..]);
        out.push('Z');
        return out;
    }

    if timestamp.contains('T') && !timestamp.ends_with('Z') {
        let mut out = String::with_capacity(timestamp.len() + 1);
        out.push_str(timestamp);
        out.push('Z');
        return out;
    }

    timestamp.to_string()
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    from_duration(now)
}

/// Format a duration since the Unix epoch as ISO 8601, second precision.
fn from_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    // Time of day
    let day_secs = secs % 86400;
    let hours = (day_secs / 3600) as u8;
    let minutes = ((day_secs % 3600) / 60) as u8;
    let seconds = (day_secs % 60) as u8;

    // Days since epoch
    let days = secs / 86400;

    // Year calculation (valid for 1970-2099)
    let mut year = 1970u16;
    let mut remaining = days as i64;

    loop {
        let year_days = if is_leap_year(year) { 366 } else { 365 };
        if remaining < year_days {
            break;
        }
        remaining -= year_days;
        year += 1;
    }

    // Month/day calculation
    let month_days: [u8; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1u8;
    for &days_in_month in &month_days {
        if remaining < days_in_month as i64 {
            break;
        }
        remaining -= days_in_month as i64;
        month += 1;
    }
    let day = (remaining + 1) as u8;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    )
}

/// Check if a year is a leap year.
const fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}
