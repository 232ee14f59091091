pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// How long a write waits on a lock held by another connection to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the booking database at `path` and brings its schema up to date.
///
/// `":memory:"` gives a private throwaway database; WAL is only requested for
/// file-backed databases since SQLite ignores it in memory.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("failed to open database at {path}"))?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set database busy timeout")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .context("failed to enable foreign keys")?;
    if path != ":memory:" {
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("failed to enable write-ahead logging")?;
    }

    migrations::run_migrations(&conn)?;
    tracing::info!(path, "booking database ready");

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_booking_schema() {
        let conn = init_db(":memory:").unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        for table in ["bookings", "memberships", "payments"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }

        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_init_db_reports_unopenable_path() {
        let err = init_db("/nonexistent-dir/nailbook.db").unwrap_err();
        assert!(err.to_string().contains("/nonexistent-dir/nailbook.db"));
    }
}
