//! Wall-clock helpers in Unix milliseconds (no chrono dependency).
//!
//! Uses Howard Hinnant's civil_from_days algorithm for date formatting.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::MS_PER_DAY;

/// Current UTC time as Unix milliseconds.
pub fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Current UTC timestamp in ISO-8601 format.
pub fn now_iso8601() -> String {
    unix_millis_to_iso8601(now_unix_millis())
}

/// Convert Unix milliseconds to an ISO-8601 UTC string (second precision).
pub fn unix_millis_to_iso8601(ms: i64) -> String {
    let secs = ms.div_euclid(1000);
    let days = secs.div_euclid(86400);
    let time_of_day = secs.rem_euclid(86400);
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// Whole days from `now_ms` until `due_ms`, rounded up. Negative when overdue.
pub fn days_until(due_ms: i64, now_ms: i64) -> i64 {
    let diff = due_ms - now_ms;
    if diff >= 0 {
        (diff + MS_PER_DAY - 1) / MS_PER_DAY
    } else {
        diff / MS_PER_DAY
    }
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(unix_millis_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_known_date() {
        // 2026-02-21T00:00:00Z
        assert_eq!(unix_millis_to_iso8601(1_771_632_000_000), "2026-02-21T00:00:00Z");
        assert_eq!(unix_millis_to_iso8601(1_771_632_000_999), "2026-02-21T00:00:00Z");
    }

    #[test]
    fn test_before_epoch() {
        assert_eq!(unix_millis_to_iso8601(-1000), "1969-12-31T23:59:59Z");
    }

    #[test]
    fn test_days_until() {
        let now = 1_771_632_000_000;
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now + 1, now), 1);
        assert_eq!(days_until(now + 6 * MS_PER_DAY, now), 6);
        assert_eq!(days_until(now - 2 * MS_PER_DAY, now), -2);
    }

    #[test]
    fn test_now_is_recent() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"), "timestamp should be in the 2000s: {ts}");
    }
}
