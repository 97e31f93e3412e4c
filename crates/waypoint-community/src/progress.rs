//! Completion percentages and ranking order.
//!
//! Pure functions over counts already read from the database, so the
//! arithmetic and tie-breaking can be tested without a connection.

use std::cmp::Ordering;

use crate::types::RankingEntry;

/// `completed / possible * 100`, rounded to two decimals, clamped to
/// `0..=100`. Zero when nothing is possible.
pub fn percent(completed: i64, possible: i64) -> f64 {
    if possible <= 0 || completed <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = completed as f64 / possible as f64;
    round2(ratio.min(1.0) * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One user's totals before ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankInput {
    /// Ranked user.
    pub user_id: String,
    /// Completed rows across the community.
    pub completed_tasks: i64,
    /// Latest completion timestamp, if any.
    pub last_completed_at: Option<String>,
}

/// Order users by completed rows (descending), then by latest completion
/// (earliest first, users without completions last), then by user ID, and
/// number them from 1.
pub fn rank(mut rows: Vec<RankInput>) -> Vec<RankingEntry> {
    rows.sort_by(|a, b| {
        b.completed_tasks
            .cmp(&a.completed_tasks)
            .then_with(|| compare_last_completed(a.last_completed_at.as_deref(), b.last_completed_at.as_deref()))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankingEntry {
            rank: i + 1,
            user_id: row.user_id,
            completed_tasks: row.completed_tasks,
            last_completed_at: row.last_completed_at,
        })
        .collect()
}

fn compare_last_completed(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(user: &str, completed: i64, last: Option<&str>) -> RankInput {
        RankInput {
            user_id: user.into(),
            completed_tasks: completed,
            last_completed_at: last.map(String::from),
        }
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        assert!((percent(2, 3) - 66.67).abs() < f64::EPSILON);
        assert!((percent(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((percent(2, 2) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_of_nothing_is_zero() {
        assert!(percent(0, 0).abs() < f64::EPSILON);
        assert!(percent(5, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn earlier_last_completion_wins_ties() {
        let ranked = rank(vec![
            input("p1", 3, Some("2026-05-01T10:00:00Z")),
            input("p2", 3, Some("2026-05-01T09:00:00Z")),
            input("p3", 5, Some("2026-05-02T00:00:00Z")),
        ]);
        let order: Vec<(&str, usize)> = ranked.iter().map(|r| (r.user_id.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("p3", 1), ("p2", 2), ("p1", 3)]);
    }

    #[test]
    fn users_without_completions_sort_last() {
        let ranked = rank(vec![
            input("idle", 0, None),
            input("busy", 0, Some("2026-05-01T09:00:00Z")),
        ]);
        assert_eq!(ranked[0].user_id, "busy");
        assert_eq!(ranked[1].user_id, "idle");
    }

    proptest! {
        #[test]
        fn percent_stays_in_bounds(completed in 0i64..10_000, possible in 0i64..10_000) {
            let p = percent(completed.min(possible), possible);
            prop_assert!((0.0..=100.0).contains(&p));
            if possible == 0 {
                prop_assert!(p.abs() < f64::EPSILON);
            }
        }

        #[test]
        fn ranks_are_dense_and_ordered(counts in proptest::collection::vec(0i64..20, 0..30)) {
            let rows = counts
                .iter()
                .enumerate()
                .map(|(i, &c)| input(&format!("u{i:02}"), c, None))
                .collect();
            let ranked = rank(rows);
            for (i, entry) in ranked.iter().enumerate() {
                prop_assert_eq!(entry.rank, i + 1);
            }
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].completed_tasks >= pair[1].completed_tasks);
            }
        }
    }
}
