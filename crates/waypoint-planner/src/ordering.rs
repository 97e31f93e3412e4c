//! Ordered sequences over project tasks and project actions.
//!
//! A [`Sequence`] names one ordered container: the tasks a user keeps in a
//! project, or the actions of a project. Every member carries a distinct
//! `order_index`; gaps left by deletions are tolerated, duplicates never are.
//!
//! Both tables carry a partial unique index on the sequence key, and `SQLite`
//! checks it row by row while an `UPDATE` runs. A naive
//! `SET order_index = order_index + 1` therefore collides with the next row
//! mid-statement. Shifts go through [`shift_range`], which first parks the
//! range at distinct negative values and then flips it back. Callers run
//! inside a `BEGIN IMMEDIATE` transaction ([`waypoint_store::immediate`]) so
//! no other writer sees the intermediate state.

use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use tracing::debug;

use waypoint_core::{DomainError, Result, now_iso};

/// One ordered container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sequence<'a> {
    /// A user's tasks inside a project.
    ProjectTasks {
        /// Task owner.
        user_id: &'a str,
        /// Containing project.
        project_id: &'a str,
    },
    /// The actions of a project.
    ProjectActions {
        /// Owning project.
        project_id: &'a str,
    },
}

impl Sequence<'_> {
    fn table(&self) -> &'static str {
        match self {
            Self::ProjectTasks { .. } => "tasks",
            Self::ProjectActions { .. } => "project_actions",
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            Self::ProjectTasks { .. } => "user_id = ?1 AND project_id = ?2",
            Self::ProjectActions { .. } => "project_id = ?1",
        }
    }

    fn bind(&self) -> Vec<&dyn ToSql> {
        match self {
            Self::ProjectTasks {
                user_id,
                project_id,
            } => vec![user_id as &dyn ToSql, project_id as &dyn ToSql],
            Self::ProjectActions { project_id } => vec![project_id as &dyn ToSql],
        }
    }
}

/// Index one past the current maximum, or 0 for an empty sequence.
pub fn next_index(conn: &Connection, seq: Sequence<'_>) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM {} WHERE {} AND order_index IS NOT NULL",
        seq.table(),
        seq.scope()
    );
    Ok(conn.query_row(&sql, params_from_iter(seq.bind()), |row| row.get(0))?)
}

/// Current index of a member, `None` if unplaced or absent.
pub fn index_of(conn: &Connection, seq: Sequence<'_>, id: &str) -> Result<Option<i64>> {
    let n = seq.bind().len();
    let sql = format!(
        "SELECT order_index FROM {} WHERE {} AND id = ?{}",
        seq.table(),
        seq.scope(),
        n + 1
    );
    let mut values = seq.bind();
    values.push(&id);
    let found: Option<Option<i64>> = conn
        .query_row(&sql, params_from_iter(values), |row| row.get(0))
        .optional()?;
    Ok(found.flatten())
}

/// Add `delta` to every index in `lo..=hi`.
///
/// Two statements: park the range at `-(i + delta) - 1`, then map every
/// negative value `v` back to `-v - 1`. Neither statement can produce a
/// transient duplicate.
pub fn shift_range(conn: &Connection, seq: Sequence<'_>, lo: i64, hi: i64, delta: i64) -> Result<usize> {
    if lo > hi || delta == 0 {
        return Ok(0);
    }
    let n = seq.bind().len();
    let park = format!(
        "UPDATE {} SET order_index = -(order_index + ?{d}) - 1 \
         WHERE {} AND order_index BETWEEN ?{lo} AND ?{hi}",
        seq.table(),
        seq.scope(),
        d = n + 1,
        lo = n + 2,
        hi = n + 3,
    );
    let mut values = seq.bind();
    values.push(&delta);
    values.push(&lo);
    values.push(&hi);
    let moved = conn.execute(&park, params_from_iter(values))?;

    let restore = format!(
        "UPDATE {} SET order_index = -order_index - 1 WHERE {} AND order_index < 0",
        seq.table(),
        seq.scope()
    );
    let _ = conn.execute(&restore, params_from_iter(seq.bind()))?;

    debug!(table = seq.table(), lo, hi, delta, moved, "shifted sequence range");
    Ok(moved)
}

/// Make room at `at` by shifting `at..` up by `width`.
pub fn open_gap(conn: &Connection, seq: Sequence<'_>, at: i64, width: i64) -> Result<usize> {
    shift_range(conn, seq, at, i64::MAX - width, width)
}

/// Remove a member from the ordering (its index becomes NULL).
///
/// The gap it leaves is not closed.
pub fn detach(conn: &Connection, seq: Sequence<'_>, id: &str) -> Result<()> {
    let n = seq.bind().len();
    let sql = format!(
        "UPDATE {} SET order_index = NULL WHERE {} AND id = ?{}",
        seq.table(),
        seq.scope(),
        n + 1
    );
    let mut values = seq.bind();
    values.push(&id);
    let _ = conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

/// Place a member of the sequence at `target`, shifting its neighbours.
///
/// - unplaced member: indices `>= target` move up by one
/// - moving down (`target > old`): indices in `(old, target]` move up the list by one
/// - moving up (`target < old`): indices in `[target, old)` move down the list by one
///
/// `target` is clamped to the end of the sequence. Returns the final index.
pub fn place(conn: &Connection, seq: Sequence<'_>, id: &str, target: i64) -> Result<i64> {
    if target < 0 {
        return Err(DomainError::validation("order_index must be zero or greater"));
    }
    let old = index_of(conn, seq, id)?;
    detach(conn, seq, id)?;
    let end = next_index(conn, seq)?;

    let target = match old {
        None => {
            let target = target.min(end);
            let _ = open_gap(conn, seq, target, 1)?;
            target
        }
        Some(old) => {
            // With the member detached, `end` may sit just past a gap at `old`.
            let target = target.min((end - 1).max(old));
            if target > old {
                let _ = shift_range(conn, seq, old + 1, target, -1)?;
            } else if target < old {
                let _ = shift_range(conn, seq, target, old - 1, 1)?;
            }
            target
        }
    };

    set_index(conn, seq, id, target)?;
    Ok(target)
}

/// Append a member at the end of the sequence. Returns the assigned index.
pub fn append(conn: &Connection, seq: Sequence<'_>, id: &str) -> Result<i64> {
    detach(conn, seq, id)?;
    let index = next_index(conn, seq)?;
    set_index(conn, seq, id, index)?;
    Ok(index)
}

/// Place several members consecutively in the given order.
///
/// With `start`, room for all of them is opened at `start`; otherwise they
/// go after the current end. Members must already belong to the sequence's
/// container (their index may be anything, it is reset first).
pub fn place_block(conn: &Connection, seq: Sequence<'_>, ids: &[String], start: Option<i64>) -> Result<i64> {
    for id in ids {
        detach(conn, seq, id)?;
    }
    let end = next_index(conn, seq)?;
    let width = i64::try_from(ids.len()).map_err(|_| DomainError::validation("too many ids"))?;
    let start = match start {
        Some(s) if s < 0 => {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        Some(s) if s < end => {
            let _ = open_gap(conn, seq, s, width)?;
            s
        }
        _ => end,
    };
    for (offset, id) in (0_i64..).zip(ids) {
        set_index(conn, seq, id, start + offset)?;
    }
    Ok(start)
}

fn set_index(conn: &Connection, seq: Sequence<'_>, id: &str, index: i64) -> Result<()> {
    let n = seq.bind().len();
    let sql = format!(
        "UPDATE {} SET order_index = ?{}, updated_at = ?{} WHERE {} AND id = ?{}",
        seq.table(),
        n + 1,
        n + 2,
        seq.scope(),
        n + 3
    );
    let now = now_iso();
    let mut values = seq.bind();
    values.push(&index);
    values.push(&now);
    values.push(&id);
    let changed = conn.execute(&sql, params_from_iter(values))?;
    if changed == 0 {
        return Err(DomainError::Internal(format!(
            "{} row {id} is not in the target sequence",
            seq.table()
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::testing::{setup_db, seed_project};
    use proptest::prelude::*;

    fn insert_action(conn: &Connection, project_id: &str, id: &str) {
        conn.execute(
            "INSERT INTO project_actions (id, project_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?1, 'x', 'x')",
            rusqlite::params![id, project_id],
        )
        .unwrap();
    }

    fn order(conn: &Connection, project_id: &str) -> Vec<(String, i64)> {
        conn.prepare(
            "SELECT id, order_index FROM project_actions
             WHERE project_id = ?1 AND order_index IS NOT NULL ORDER BY order_index",
        )
        .unwrap()
        .query_map([project_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .map(std::result::Result::unwrap)
        .collect()
    }

    fn ids(conn: &Connection, project_id: &str) -> Vec<String> {
        order(conn, project_id).into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn append_assigns_dense_indices() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a1", "a2", "a3"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        assert_eq!(
            order(&conn, &project),
            vec![("a1".into(), 0), ("a2".into(), 1), ("a3".into(), 2)]
        );
    }

    #[test]
    fn insert_at_index_shifts_following_members() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a1", "a2"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        insert_action(&conn, &project, "a0");
        assert_eq!(place(&conn, seq, "a0", 0).unwrap(), 0);
        assert_eq!(
            order(&conn, &project),
            vec![("a0".into(), 0), ("a1".into(), 1), ("a2".into(), 2)]
        );
    }

    #[test]
    fn move_down_closes_gap_behind() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a", "b", "c", "d"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        place(&conn, seq, "a", 2).unwrap();
        assert_eq!(ids(&conn, &project), vec!["b", "c", "a", "d"]);
        assert_eq!(index_of(&conn, seq, "d").unwrap(), Some(3));
    }

    #[test]
    fn move_up_opens_gap_ahead() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a", "b", "c", "d"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        place(&conn, seq, "d", 1).unwrap();
        assert_eq!(ids(&conn, &project), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn target_past_end_is_clamped() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a", "b", "c"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        assert_eq!(place(&conn, seq, "a", 99).unwrap(), 2);
        assert_eq!(ids(&conn, &project), vec!["b", "c", "a"]);
    }

    #[test]
    fn negative_target_is_rejected() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        insert_action(&conn, &project, "a");
        assert!(matches!(place(&conn, seq, "a", -1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn block_placement_keeps_caller_order() {
        let conn = setup_db();
        let project = seed_project(&conn, "u1");
        let seq = Sequence::ProjectActions { project_id: &project };
        for id in ["a", "b", "c", "x", "y"] {
            insert_action(&conn, &project, id);
            append(&conn, seq, id).unwrap();
        }
        let start = place_block(&conn, seq, &["y".into(), "x".into()], Some(1)).unwrap();
        assert_eq!(start, 1);
        assert_eq!(ids(&conn, &project), vec!["a", "y", "x", "b", "c"]);
    }

    #[test]
    fn sequences_are_independent_per_project() {
        let conn = setup_db();
        let p1 = seed_project(&conn, "u1");
        let p2 = seed_project(&conn, "u1");
        insert_action(&conn, &p1, "a");
        insert_action(&conn, &p2, "b");
        append(&conn, Sequence::ProjectActions { project_id: &p1 }, "a").unwrap();
        append(&conn, Sequence::ProjectActions { project_id: &p2 }, "b").unwrap();
        assert_eq!(order(&conn, &p1), vec![("a".into(), 0)]);
        assert_eq!(order(&conn, &p2), vec![("b".into(), 0)]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i64),
        Append,
        Move(usize, i64),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0_i64..8).prop_map(Op::Insert),
            Just(Op::Append),
            (0_usize..16, 0_i64..8).prop_map(|(m, t)| Op::Move(m, t)),
            (0_usize..16).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn indices_stay_unique(ops in proptest::collection::vec(op(), 1..30)) {
            let conn = setup_db();
            let project = seed_project(&conn, "u1");
            let seq = Sequence::ProjectActions { project_id: &project };
            let mut live: Vec<String> = Vec::new();
            for (n, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Insert(at) => {
                        let id = format!("n{n}");
                        insert_action(&conn, &project, &id);
                        place(&conn, seq, &id, at).unwrap();
                        live.push(id);
                    }
                    Op::Append => {
                        let id = format!("n{n}");
                        insert_action(&conn, &project, &id);
                        append(&conn, seq, &id).unwrap();
                        live.push(id);
                    }
                    Op::Move(m, to) if !live.is_empty() => {
                        let id = live[m % live.len()].clone();
                        place(&conn, seq, &id, to).unwrap();
                    }
                    Op::Delete(m) if !live.is_empty() => {
                        let id = live.remove(m % live.len());
                        conn.execute("DELETE FROM project_actions WHERE id = ?1", [&id]).unwrap();
                    }
                    _ => {}
                }
                let indices: Vec<i64> = order(&conn, &project).into_iter().map(|(_, i)| i).collect();
                let mut deduped = indices.clone();
                deduped.dedup();
                prop_assert_eq!(&indices, &deduped);
                prop_assert_eq!(indices.len(), live.len());
                prop_assert!(indices.iter().all(|i| *i >= 0));
            }
        }
    }
}
