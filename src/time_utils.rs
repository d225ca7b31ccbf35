// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a remaining duration as `"{h}h {m}m"` or `"{m}m"`, rounding up
/// to the next whole minute.
pub fn format_hours_minutes(remaining: Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    let minutes = (seconds + 59) / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hours_minutes() {
        assert_eq!(format_hours_minutes(Duration::minutes(120)), "2h 0m");
        assert_eq!(format_hours_minutes(Duration::minutes(61)), "1h 1m");
        assert_eq!(format_hours_minutes(Duration::seconds(59 * 60 + 1)), "1h 0m");
        assert_eq!(format_hours_minutes(Duration::seconds(30)), "1m");
        assert_eq!(format_hours_minutes(Duration::seconds(-5)), "0m");
    }

    #[test]
    fn test_format_utc_rfc3339() {
        let date = DateTime::from_timestamp(1_704_103_200, 500).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-01T10:00:00Z");
    }
}
