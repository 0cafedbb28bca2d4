//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for telemetry updates, rule firings, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse a `"HH:MM"` 24-hour string into minutes since midnight.
///
/// Returns `None` when the string is not two colon-separated integers or
/// when either part is out of range.
#[must_use]
pub fn parse_minutes_of_day(text: &str) -> Option<u32> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_parse_hours_and_minutes() {
        assert_eq!(parse_minutes_of_day("00:00"), Some(0));
        assert_eq!(parse_minutes_of_day("06:30"), Some(390));
        assert_eq!(parse_minutes_of_day("23:59"), Some(1439));
    }

    #[test]
    fn should_reject_malformed_time_strings() {
        assert_eq!(parse_minutes_of_day("24:00"), None);
        assert_eq!(parse_minutes_of_day("12:60"), None);
        assert_eq!(parse_minutes_of_day("noon"), None);
        assert_eq!(parse_minutes_of_day("12"), None);
    }
}
