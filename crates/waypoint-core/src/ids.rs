//! ID generation and timestamp helpers.
//!
//! Server-generated IDs are `<prefix>-<uuid v7>` so they sort by creation
//! time. Timestamps are stored as second-precision UTC ISO-8601 strings,
//! which compare correctly as text in `SQLite`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Generate a prefixed UUID v7 ID.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// Get current UTC timestamp as ISO 8601 string.
pub fn now_iso() -> String {
    format_timestamp(Utc::now())
}

/// Format a UTC instant in the stored timestamp format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a client-supplied timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC), and a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_carry_prefix() {
        let id = generate_id("task");
        assert!(id.starts_with("task-"));
        let uuid = Uuid::parse_str(&id["task-".len()..]).unwrap();
        assert_eq!(uuid.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(generate_id("x"), generate_id("x"));
    }

    #[test]
    fn timestamps_format_to_seconds() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(at), "2025-03-09T07:05:01Z");
    }

    #[test]
    fn parse_accepts_supported_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(parse_timestamp("2025-03-09T07:05:01Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-09T08:05:01+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-09 07:05:01"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-09"),
            Some(Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = format_timestamp(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        let late = format_timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(early < late);
    }
}
