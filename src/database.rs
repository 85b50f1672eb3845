//! SQLite storage shared by the credential and statistics stores.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use crate::errors::{StoreError, StoreResult};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the launcher database and make sure the schema exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        info!("Opened database at {}", path.display());

        Ok(db)
    }

    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> StoreResult<()> {
        self.connection()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (login TEXT, password TEXT);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_login ON users(login);

            CREATE TABLE IF NOT EXISTS stats (version TEXT, launches INTEGER, release TEXT);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_stats_version ON stats(version);
            "#,
        )?;
        Ok(())
    }

    pub fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("database.db");

        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .unwrap()
                .execute("INSERT INTO users VALUES ('bob', 'x')", [])
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
