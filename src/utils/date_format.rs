use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Clock format used for reset times in alert messages
pub const RESET_CLOCK_FORMAT: &str = "%a, %b %-d, %H:%M";

/// Parse a timezone name from config
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| {
        anyhow!(
            "Invalid timezone '{}'. Use an IANA name such as UTC, Europe/Madrid or America/New_York",
            name
        )
    })
}

/// Compact time remaining until `reset_at`: `"2d 3h"`, `"4h 5m"`, `"12m"`,
/// or `"now"` once it has passed.
pub fn format_time_until(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = reset_at - now;
    if diff.num_milliseconds() <= 0 {
        return "now".to_string();
    }

    let minutes = diff.num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Relative reset description for alert messages: `"in 4h 5m"` or `"now"`
pub fn format_reset_relative(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match format_time_until(reset_at, now) {
        until if until == "now" => until,
        until => format!("in {}", until),
    }
}

pub fn format_reset_clock(reset_at: DateTime<Utc>, timezone: Tz) -> String {
    reset_at
        .with_timezone(&timezone)
        .format(RESET_CLOCK_FORMAT)
        .to_string()
}
