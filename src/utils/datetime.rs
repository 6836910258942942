//! Date and time utility functions
//!
//! Formats sync timestamps the way a status line shows them
//! (e.g., "just now", "5 minutes ago", "yesterday at 14:30").

use chrono::{DateTime, Duration, Utc};

/// Format of timestamps older than a day.
pub const LAST_SYNC_DATE_FORMAT: &str = "%b %d at %H:%M";

/// Format the time of the last successful sync relative to `now`
///
/// # Arguments
/// * `last_sync` - Time of the last completed pass, if any
/// * `now` - Reference time
///
/// # Returns
/// * `String` - Human-readable description
pub fn format_last_sync(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last_sync) = last_sync else {
        return "never".to_string();
    };

    let elapsed = now - last_sync;
    if elapsed < Duration::minutes(1) {
        // Also covers a clock that moved backwards
        return "just now".to_string();
    }
    if elapsed < Duration::hours(1) {
        return plural(elapsed.num_minutes(), "minute");
    }
    if elapsed < Duration::days(1) {
        return plural(elapsed.num_hours(), "hour");
    }
    if elapsed < Duration::days(2) {
        return format!("yesterday at {}", last_sync.format("%H:%M"));
    }
    last_sync.format(LAST_SYNC_DATE_FORMAT).to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}
