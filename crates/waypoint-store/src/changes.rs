//! Dynamic SQL fragments for partial updates and batch filters.

use rusqlite::Connection;
use rusqlite::types::ToSql;

use waypoint_core::now_iso;

/// `UPDATE ... SET` builder for partial updates.
///
/// Only the columns passed to [`Changes::set`] are written; `updated_at` is
/// added automatically when anything else changes.
#[derive(Default)]
pub struct Changes {
    sets: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Changes {
    /// Empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` into `column`.
    pub fn set<T: ToSql + 'static>(&mut self, column: &str, value: T) {
        self.sets.push(format!("{column} = ?"));
        self.values.push(Box::new(value));
    }

    /// Write `value` into `column` when present.
    pub fn set_some<T: ToSql + Clone + 'static>(&mut self, column: &str, value: Option<&T>) {
        if let Some(v) = value {
            self.set(column, v.clone());
        }
    }

    /// Apply to `table` where `id` matches (and `user_id`, when given).
    ///
    /// Returns whether a row changed. An empty change set touches nothing.
    pub fn apply(mut self, conn: &Connection, table: &str, id: &str, user_id: Option<&str>) -> rusqlite::Result<bool> {
        if self.sets.is_empty() {
            return Ok(false);
        }
        self.set("updated_at", now_iso());
        self.values.push(Box::new(id.to_string()));
        let mut sql = format!("UPDATE {table} SET {} WHERE id = ?", self.sets.join(", "));
        if let Some(user) = user_id {
            sql.push_str(" AND user_id = ?");
            self.values.push(Box::new(user.to_string()));
        }
        let params_refs: Vec<&dyn ToSql> = self.values.iter().map(AsRef::as_ref).collect();
        let changed = conn.execute(&sql, params_refs.as_slice())?;
        Ok(changed > 0)
    }
}

/// `?, ?, ?` for an `IN (...)` clause of `n` items.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
