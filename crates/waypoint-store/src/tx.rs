use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Run `f` inside a `BEGIN IMMEDIATE` transaction.
///
/// The write lock is taken up front, so two writers can never both read the
/// same `MAX(order_index)` and insert a duplicate. Commits when `f` returns
/// `Ok`; any `Err` (or panic) drops the transaction, which rolls back.
pub fn immediate<T, E>(conn: &Connection, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL);").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn commits_on_ok() {
        let conn = setup();
        let out: Result<i32, rusqlite::Error> = immediate(&conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(7)
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn rolls_back_on_err() {
        let conn = setup();
        let out: Result<(), rusqlite::Error> = immediate(&conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            tx.execute("INSERT INTO t (v) VALUES (NULL)", [])?;
            Ok(())
        });
        assert!(out.is_err());
        assert_eq!(count(&conn), 0);
    }
}
