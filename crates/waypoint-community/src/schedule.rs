//! Challenge scheduling windows.

use chrono::{DateTime, Utc};

use waypoint_core::parse_timestamp;

use crate::types::{Challenge, Status, TimeStatus};

/// Where `challenge` sits relative to `now`.
pub fn time_status(challenge: &Challenge, now: DateTime<Utc>) -> TimeStatus {
    if challenge.status == Status::Closed {
        return TimeStatus::Closed;
    }
    if parse_timestamp(&challenge.start_at).is_some_and(|start| now < start) {
        return TimeStatus::Upcoming;
    }
    let ended = challenge
        .end_at
        .as_deref()
        .and_then(parse_timestamp)
        .is_some_and(|end| now > end);
    if ended { TimeStatus::Finished } else { TimeStatus::Ongoing }
}

/// Whether users may join `challenge` at `now`: active and inside
/// `[start_at, end_at]` (no end means open-ended).
pub fn is_open(challenge: &Challenge, now: DateTime<Utc>) -> bool {
    time_status(challenge, now) == TimeStatus::Ongoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn challenge(start: &str, end: Option<&str>, status: Status) -> Challenge {
        Challenge {
            id: "ch".into(),
            community_id: "c".into(),
            created_by: "u".into(),
            title: "t".into(),
            description: None,
            start_at: start.into(),
            end_at: end.map(String::from),
            status,
            created_at: "x".into(),
            updated_at: "x".into(),
        }
    }

    #[test]
    fn classifies_against_window() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
        let end = Some("2026-06-30T00:00:00Z");
        assert_eq!(time_status(&challenge("2026-07-01T00:00:00Z", None, Status::Active), now), TimeStatus::Upcoming);
        assert_eq!(time_status(&challenge("2026-06-01T00:00:00Z", end, Status::Active), now), TimeStatus::Ongoing);
        assert_eq!(
            time_status(&challenge("2026-05-01T00:00:00Z", Some("2026-06-01T00:00:00Z"), Status::Active), now),
            TimeStatus::Finished
        );
        assert_eq!(time_status(&challenge("2026-06-01T00:00:00Z", end, Status::Closed), now), TimeStatus::Closed);
    }

    #[test]
    fn open_ended_challenges_stay_open() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(is_open(&challenge("2026-06-01T00:00:00Z", None, Status::Active), now));
        assert!(!is_open(&challenge("2026-06-01T00:00:00Z", None, Status::Closed), now));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let c = challenge("2026-06-01T00:00:00Z", Some("2026-06-01T00:00:00Z"), Status::Active);
        assert!(is_open(&c, start));
    }
}
