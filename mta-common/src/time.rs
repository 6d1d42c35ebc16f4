//! Timestamp utilities

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC 3339 timestamp with millisecond precision and a `Z` suffix
///
/// Matches the `processedAt` format of persisted records and the
/// `timestamp` field of API responses.
pub fn to_rfc3339_millis(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted with [`to_rfc3339_millis`]
pub fn now_rfc3339() -> String {
    to_rfc3339_millis(now())
}

/// Retention cutoff: anything processed at or before this instant has expired
pub fn cutoff_for_ttl_days(reference: DateTime<Utc>, ttl_days: u32) -> DateTime<Utc> {
    reference - ChronoDuration::days(i64::from(ttl_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_rfc3339_millis_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(to_rfc3339_millis(ts), "2025-03-14T09:26:53.000Z");
    }

    #[test]
    fn test_cutoff_for_ttl_days() {
        let reference = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap();
        let cutoff = cutoff_for_ttl_days(reference, 30);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_zero_days_is_reference() {
        let reference = now();
        assert_eq!(cutoff_for_ttl_days(reference, 0), reference);
    }
}
