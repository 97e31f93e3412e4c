//! Pooled `SQLite` handles.
//!
//! Every connection handed out by the pool has had [`ConnectionConfig::pragmas`]
//! applied: write-ahead logging, enforced foreign keys (list and challenge
//! cascades depend on them), and a busy timeout so concurrent writers queue
//! on `BEGIN IMMEDIATE` instead of failing with `SQLITE_BUSY`.

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of `SQLite` connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of a [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool sizing and per-connection pragmas.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Upper bound on open connections.
    pub pool_size: u32,
    /// How long a writer waits for the lock, in milliseconds.
    pub busy_timeout_ms: u32,
    /// Page cache per connection, in KiB.
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 5_000,
            cache_size_kib: 4_096,
        }
    }
}

impl ConnectionConfig {
    /// The pragma batch run on every new connection.
    pub fn pragmas(&self) -> String {
        format!(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = {}; \
             PRAGMA cache_size = -{};",
            self.busy_timeout_ms, self.cache_size_kib
        )
    }
}

#[derive(Debug)]
struct ApplyPragmas(String);

impl CustomizeConnection<Connection, rusqlite::Error> for ApplyPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&self.0)
    }
}

fn pool(manager: SqliteConnectionManager, max_size: u32, config: &ConnectionConfig) -> Result<ConnectionPool> {
    Ok(Pool::builder()
        .max_size(max_size)
        .connection_timeout(CHECKOUT_TIMEOUT)
        .connection_customizer(Box::new(ApplyPragmas(config.pragmas())))
        .build(manager)?)
}

/// Pool over a private in-memory database.
///
/// Every in-memory connection would be a separate database, so this pool
/// holds exactly one connection whatever `pool_size` says.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool(SqliteConnectionManager::memory(), 1, config)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool(SqliteConnectionManager::file(path), config.pool_size.max(1), config)
}

/// What a live connection reports for the pragmas the pool sets.
#[derive(Debug, PartialEq, Eq)]
pub struct PragmaState {
    /// `wal` for files, `memory` for in-memory databases.
    pub journal_mode: String,
    /// Whether foreign keys are enforced.
    pub foreign_keys_enabled: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Read the pragmas back from `conn`.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let read = |pragma: &str| conn.query_row(&format!("PRAGMA {pragma}"), [], |row| row.get::<_, rusqlite::types::Value>(0));
    let journal_mode = match read("journal_mode")? {
        rusqlite::types::Value::Text(mode) => mode,
        other => format!("{other:?}"),
    };
    let as_int = |v: rusqlite::types::Value| match v {
        rusqlite::types::Value::Integer(n) => n,
        _ => 0,
    };
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: as_int(read("foreign_keys")?) == 1,
        busy_timeout_ms: u32::try_from(as_int(read("busy_timeout")?)).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pool_holds_one_connection() {
        let config = ConnectionConfig {
            pool_size: 12,
            ..ConnectionConfig::default()
        };
        let pool = new_in_memory(&config).unwrap();
        assert_eq!(pool.max_size(), 1);

        let state = verify_pragmas(&pool.get().unwrap()).unwrap();
        assert_eq!(state.journal_mode, "memory");
        assert!(state.foreign_keys_enabled);
        assert_eq!(state.busy_timeout_ms, 5_000);
    }

    #[test]
    fn file_pool_applies_configured_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypoint.db");
        let config = ConnectionConfig {
            pool_size: 3,
            busy_timeout_ms: 1_234,
            cache_size_kib: 1_024,
        };
        let pool = new_file(path.to_str().unwrap(), &config).unwrap();
        assert_eq!(pool.max_size(), 3);

        let state = verify_pragmas(&pool.get().unwrap()).unwrap();
        assert_eq!(
            state,
            PragmaState {
                journal_mode: "wal".into(),
                foreign_keys_enabled: true,
                busy_timeout_ms: 1_234,
            }
        );
    }

    #[test]
    fn zero_pool_size_still_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypoint.db");
        let config = ConnectionConfig {
            pool_size: 0,
            ..ConnectionConfig::default()
        };
        let pool = new_file(path.to_str().unwrap(), &config).unwrap();
        assert_eq!(pool.max_size(), 1);
    }
}
