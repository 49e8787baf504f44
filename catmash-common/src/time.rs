//! Timestamp utilities
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that SQLite text comparison matches
//! chronological order.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::{Error, Result};

/// Current UTC timestamp, truncated to the stored precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", s, e)))
}

/// Whole minutes elapsed between two instants, floored, never negative
pub fn elapsed_minutes(since: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    until.signed_duration_since(since).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_db_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = a + Duration::microseconds(1);
        assert_eq!(to_db(a), "2024-01-02T03:04:05.000000Z");
        assert_eq!(to_db(a).len(), to_db(b).len());
        assert!(to_db(a) < to_db(b));
    }

    #[test]
    fn test_db_round_trip_preserves_micros() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap()
            + Duration::microseconds(123_456);
        assert_eq!(from_db(&to_db(ts)).unwrap(), ts);
    }

    #[test]
    fn test_now_survives_storage() {
        let ts = now();
        assert_eq!(from_db(&to_db(ts)).unwrap(), ts);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("yesterday").is_err());
    }

    #[test]
    fn test_elapsed_minutes_floors() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(59)), 0);
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(150)), 2);
        assert_eq!(elapsed_minutes(start + Duration::minutes(5), start), 0);
    }
}
